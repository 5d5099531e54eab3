use rocket::Request;
use rocket::http::Header;
use rocket::response::{self, Responder};

/// Wraps a responder and opens it to any origin, for endpoints embedded on
/// third-party sites.
pub struct Cors<R> {
    inner: R,
    methods: &'static str,
}

impl<R> Cors<R> {
    pub fn new(inner: R, methods: &'static str) -> Self {
        Self { inner, methods }
    }
}

impl<'r, 'o: 'r, R: Responder<'r, 'o>> Responder<'r, 'o> for Cors<R> {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let mut response = self.inner.respond_to(req)?;
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new("Access-Control-Allow-Methods", self.methods));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type"));
        Ok(response)
    }
}

/// Empty preflight answer.
pub fn preflight(methods: &'static str) -> Cors<rocket::http::Status> {
    Cors::new(rocket::http::Status::NoContent, methods)
}
