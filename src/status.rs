//! HTTP status codes as a typed enum.
//!
//! Covers what a captive portal and its embedded handlers realistically send.
//! Use [`Status`] anywhere a status code is accepted: `Response::status()`,
//! `Response::builder().status()`, or as a bare handler return value.
//!
//! ```rust
//! use snare::{Response, Status};
//!
//! Response::builder()
//!     .status(Status::Found)
//!     .header("location", "http://192.168.4.1/")
//!     .no_body();
//!
//! async fn forget(_req: snare::Request) -> Status {
//!     Status::NoContent
//! }
//! ```

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    // ── 2xx Success ───────────────────────────────────────────────────────────
    Ok,                     // 200
    Created,                // 201
    Accepted,               // 202
    NoContent,              // 204

    // ── 3xx Redirection ───────────────────────────────────────────────────────
    MovedPermanently,       // 301
    Found,                  // 302
    SeeOther,               // 303
    TemporaryRedirect,      // 307

    // ── 4xx Client errors ─────────────────────────────────────────────────────
    BadRequest,             // 400
    Unauthorized,           // 401
    Forbidden,              // 403
    NotFound,               // 404
    MethodNotAllowed,       // 405
    Conflict,               // 409
    ContentTooLarge,        // 413
    UnprocessableContent,   // 422

    // ── 5xx Server errors ─────────────────────────────────────────────────────
    InternalServerError,    // 500
    NotImplemented,         // 501
    ServiceUnavailable,     // 503
    NetworkAuthenticationRequired, // 511
}

impl From<Status> for u16 {
    fn from(s: Status) -> u16 {
        match s {
            Status::Ok                            => 200,
            Status::Created                       => 201,
            Status::Accepted                      => 202,
            Status::NoContent                     => 204,
            Status::MovedPermanently              => 301,
            Status::Found                         => 302,
            Status::SeeOther                      => 303,
            Status::TemporaryRedirect             => 307,
            Status::BadRequest                    => 400,
            Status::Unauthorized                  => 401,
            Status::Forbidden                     => 403,
            Status::NotFound                      => 404,
            Status::MethodNotAllowed              => 405,
            Status::Conflict                      => 409,
            Status::ContentTooLarge               => 413,
            Status::UnprocessableContent          => 422,
            Status::InternalServerError           => 500,
            Status::NotImplemented                => 501,
            Status::ServiceUnavailable            => 503,
            Status::NetworkAuthenticationRequired => 511,
        }
    }
}
