//! Print the service's OpenAPI document as pretty JSON, for committing
//! alongside API clients.

use squad_herald::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json().unwrap());
}
