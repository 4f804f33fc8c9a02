// JSON API routes

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::constants::FILMS_PAGE_SIZE;
use crate::db::schema::{self, Chapter, Film, Location, Person, Tag};
use crate::error::VaultError;
use crate::import::parse;
use crate::{genealogy, search};

use super::state::ServerState;

/// API error with a JSON body; status code follows the error kind.
pub struct ApiError(VaultError);

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            VaultError::FilmNotFound(_)
            | VaultError::PersonNotFound(_)
            | VaultError::JobNotFound(_)
            | VaultError::FileNotFound(_)
            | VaultError::NotFound(_) => StatusCode::NOT_FOUND,
            VaultError::InvalidRelationship(_)
            | VaultError::InvalidTime(_)
            | VaultError::InvalidBitfield(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ServerStats {
    uptime_seconds: u64,
    films: i64,
    chapters: i64,
    people: i64,
    locations: i64,
    tags: i64,
}

async fn stats(State(state): State<ServerState>) -> ApiResult<Json<ServerStats>> {
    let conn = state.catalog.lock();
    Ok(Json(ServerStats {
        uptime_seconds: state.start_time.elapsed().as_secs(),
        films: schema::count_films(&conn)?,
        chapters: schema::count_chapters(&conn)?,
        people: schema::count_people(&conn)?,
        locations: schema::count_locations(&conn)?,
        tags: schema::count_tags(&conn)?,
    }))
}

// ---------------------------------------------------------------------------
// Films
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PageQuery {
    #[serde(default)]
    page: Option<i64>,
}

#[derive(Serialize)]
struct FilmListResponse {
    films: Vec<Film>,
    total: i64,
    page: i64,
    page_size: i64,
}

async fn list_films(
    State(state): State<ServerState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<FilmListResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let conn = state.catalog.lock();

    let films = schema::list_films(&conn, FILMS_PAGE_SIZE, (page - 1) * FILMS_PAGE_SIZE)?;
    let total = schema::count_films(&conn)?;

    Ok(Json(FilmListResponse {
        films,
        total,
        page,
        page_size: FILMS_PAGE_SIZE,
    }))
}

#[derive(Serialize)]
struct FilmDetail {
    film: Film,
    chapters: Vec<Chapter>,
    people: Vec<Person>,
    locations: Vec<Location>,
    tags: Vec<Tag>,
    years: Vec<i64>,
}

async fn get_film(
    State(state): State<ServerState>,
    Path(file_id): Path<String>,
) -> ApiResult<Json<FilmDetail>> {
    let conn = state.catalog.lock();

    let film = schema::get_film_by_file_id(&conn, &file_id)?
        .ok_or_else(|| VaultError::FilmNotFound(file_id.clone()))?;

    let chapters = schema::list_chapters(&conn, film.id)?;
    let people = schema::film_people_aggregated(&conn, film.id)?;
    let locations = schema::film_locations_aggregated(&conn, film.id)?;
    let tags = schema::film_tags_aggregated(&conn, film.id)?;

    let mut years: Vec<i64> = Vec::new();
    for field in schema::film_years_fields(&conn, film.id)? {
        years.extend(parse::extract_years(&field));
    }
    years.sort_unstable();
    years.dedup();

    Ok(Json(FilmDetail {
        film,
        chapters,
        people,
        locations,
        tags,
        years,
    }))
}

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct BrowseQuery {
    #[serde(default)]
    q: Option<String>,
}

async fn list_people(
    State(state): State<ServerState>,
    Query(query): Query<BrowseQuery>,
) -> ApiResult<Json<Vec<search::PersonHit>>> {
    let conn = state.catalog.lock();
    Ok(Json(search::browse_people(&conn, query.q.as_deref())?))
}

#[derive(Serialize)]
struct PersonDetail {
    person: Person,
    film_count: i64,
    films: Vec<Film>,
}

async fn get_person(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<PersonDetail>> {
    let conn = state.catalog.lock();

    let person = schema::get_person(&conn, id)?
        .ok_or(VaultError::PersonNotFound(id))?;
    let film_count = schema::person_film_count(&conn, id)?;
    let films = search::films_for_people(&conn, &[id])?;

    Ok(Json(PersonDetail { person, film_count, films }))
}

#[derive(Deserialize)]
struct RelationshipsBody {
    father_id: Option<i64>,
    mother_id: Option<i64>,
    spouse_id: Option<i64>,
}

async fn put_relationships(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(body): Json<RelationshipsBody>,
) -> ApiResult<Json<Person>> {
    let conn = state.catalog.lock();

    genealogy::set_relationships(&conn, id, body.father_id, body.mother_id, body.spouse_id)?;
    let person = schema::get_person(&conn, id)?
        .ok_or(VaultError::PersonNotFound(id))?;

    Ok(Json(person))
}

async fn merge_person(
    State(state): State<ServerState>,
    Path((dst_id, src_id)): Path<(i64, i64)>,
) -> ApiResult<Json<genealogy::MergeStats>> {
    let conn = state.catalog.lock();
    let stats = genealogy::merge_person(&conn, dst_id, src_id)?;
    Ok(Json(stats))
}

// ---------------------------------------------------------------------------
// Locations / tags
// ---------------------------------------------------------------------------

async fn list_locations(
    State(state): State<ServerState>,
    Query(query): Query<BrowseQuery>,
) -> ApiResult<Json<Vec<search::LocationHit>>> {
    let conn = state.catalog.lock();
    Ok(Json(search::browse_locations(&conn, query.q.as_deref())?))
}

#[derive(Serialize)]
struct LocationDetail {
    location: Location,
    film_count: i64,
    films: Vec<Film>,
}

async fn get_location(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LocationDetail>> {
    let conn = state.catalog.lock();

    let location = schema::get_location(&conn, id)?
        .ok_or_else(|| VaultError::NotFound(format!("location {}", id)))?;
    let film_count = schema::location_film_count(&conn, id)?;
    let films = search::films_for_locations(&conn, &[id])?;

    Ok(Json(LocationDetail { location, film_count, films }))
}

#[derive(Deserialize)]
struct TagsQuery {
    #[serde(default)]
    category: Option<String>,
}

async fn list_tags(
    State(state): State<ServerState>,
    Query(query): Query<TagsQuery>,
) -> ApiResult<Json<std::collections::BTreeMap<String, Vec<search::TagHit>>>> {
    let conn = state.catalog.lock();
    Ok(Json(search::browse_tags(&conn, query.category.as_deref())?))
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn overall_search(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<search::OverallResults>> {
    let conn = state.catalog.lock();
    Ok(Json(search::overall_search(&conn, &query.q)?))
}

/// Comma-separated id list ("1,2,3"); junk entries are ignored.
fn parse_id_list(raw: &str) -> Vec<i64> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

#[derive(Deserialize)]
struct PeopleSearchQuery {
    #[serde(default)]
    people: String,
}

async fn search_by_people(
    State(state): State<ServerState>,
    Query(query): Query<PeopleSearchQuery>,
) -> ApiResult<Json<Vec<Film>>> {
    let conn = state.catalog.lock();
    let ids = parse_id_list(&query.people);
    Ok(Json(search::films_for_people(&conn, &ids)?))
}

#[derive(Deserialize)]
struct LocationsSearchQuery {
    #[serde(default)]
    locations: String,
}

async fn search_by_locations(
    State(state): State<ServerState>,
    Query(query): Query<LocationsSearchQuery>,
) -> ApiResult<Json<Vec<Film>>> {
    let conn = state.catalog.lock();
    let ids = parse_id_list(&query.locations);
    Ok(Json(search::films_for_locations(&conn, &ids)?))
}

#[derive(Deserialize)]
struct YearsSearchQuery {
    #[serde(default)]
    years: String,
}

#[derive(Serialize)]
struct YearsSearchResponse {
    decades: std::collections::BTreeMap<i64, Vec<search::YearCount>>,
    films: Vec<Film>,
}

async fn search_by_years(
    State(state): State<ServerState>,
    Query(query): Query<YearsSearchQuery>,
) -> ApiResult<Json<YearsSearchResponse>> {
    let conn = state.catalog.lock();
    let years = parse_id_list(&query.years);

    Ok(Json(YearsSearchResponse {
        decades: search::years_by_decade(&conn)?,
        films: search::films_for_years(&conn, &years)?,
    }))
}

#[derive(Deserialize)]
struct TagsSearchQuery {
    #[serde(default)]
    tags: String,
}

async fn search_by_tags(
    State(state): State<ServerState>,
    Query(query): Query<TagsSearchQuery>,
) -> ApiResult<Json<Vec<Film>>> {
    let conn = state.catalog.lock();
    let tags: Vec<String> = query
        .tags
        .split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    Ok(Json(search::films_for_tags(&conn, &tags)?))
}

// ---------------------------------------------------------------------------
// Autocomplete / genealogy
// ---------------------------------------------------------------------------

async fn autocomplete_people(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<search::AutocompleteEntry>>> {
    let conn = state.catalog.lock();
    Ok(Json(search::people_autocomplete(&conn, &query.q)?))
}

async fn autocomplete_locations(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<search::AutocompleteEntry>>> {
    let conn = state.catalog.lock();
    Ok(Json(search::locations_autocomplete(&conn, &query.q)?))
}

#[derive(Deserialize)]
struct TreeQuery {
    #[serde(default)]
    depth: Option<u32>,
}

async fn family_tree(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Query(query): Query<TreeQuery>,
) -> ApiResult<Json<genealogy::FamilyTree>> {
    let conn = state.catalog.lock();
    Ok(Json(genealogy::family_tree_data(&conn, id, query.depth)?))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn make_api_routes(state: ServerState) -> Router {
    Router::new()
        .route("/stats", get(stats))
        .route("/films", get(list_films))
        .route("/films/:file_id", get(get_film))
        .route("/people", get(list_people))
        .route("/people/:id", get(get_person))
        .route("/people/:id/relationships", put(put_relationships))
        .route("/people/:dst_id/merge/:src_id", post(merge_person))
        .route("/locations", get(list_locations))
        .route("/locations/:id", get(get_location))
        .route("/tags", get(list_tags))
        .route("/search", get(overall_search))
        .route("/search/people", get(search_by_people))
        .route("/search/locations", get(search_by_locations))
        .route("/search/years", get(search_by_years))
        .route("/search/tags", get(search_by_tags))
        .route("/autocomplete/people", get(autocomplete_people))
        .route("/autocomplete/locations", get(autocomplete_locations))
        .route("/genealogy/tree/:id", get(family_tree))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2,3"), vec![1, 2, 3]);
        assert_eq!(parse_id_list(" 4 , junk , 5 "), vec![4, 5]);
        assert!(parse_id_list("").is_empty());
    }
}
