//! HTTP API for registering accounts and publishing DNS-01 challenge response values.
//!
//! # API Endpoints
//!
//! ## `/health` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/register` (POST)
//!
//!   Creates an account. Accepts an optional JSON request body restricting the networks its
//!   updates may come from:
//!
//!   ```json
//!   { "allowfrom": [ "192.0.2.0/24", "[2001:db8::1]/128" ] }
//!   ```
//!
//!   Returns HTTP 201 (Created) and a JSON body of the form:
//!
//!   ```json
//!   {
//!     "username": "a097455b-52cc-4569-90c8-7a4b97c6eba8",
//!     "password": "xxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxxx",
//!     "fulldomain": "d420c923-bbd7-4056-ab64-c3ca54c9b3cf.auth.example.org",
//!     "subdomain": "d420c923-bbd7-4056-ab64-c3ca54c9b3cf",
//!     "allowfrom": [ "192.0.2.0/24", "2001:db8::1/128" ]
//!   }
//!   ```
//!
//!   The password is shown once and only a hash of it is kept. An `allowfrom` entry that isn't
//!   a CIDR network is answered with HTTP 400 and `{"error":"invalid_allowfrom_cidr"}`.
//!
//!   Absent (HTTP 404) when [`Config::disable_registration`][crate::config::Config] is set.
//!
//! ## `/update` (POST)
//!
//!   Requires the `X-Api-User` and `X-Api-Key` headers of a registered account, and expects a
//!   JSON request body of the form:
//!
//!   ```json
//!   { "subdomain": "d420c923-bbd7-4056-ab64-c3ca54c9b3cf", "txt": "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX" }
//!   ```
//!
//!  Where `subdomain` is the account's own subdomain. The request must come from an address in
//!  the account's `allowfrom` list, if it has one. With
//!  [`Config::use_header`][crate::config::Config] set, the addresses listed in the
//!  [`Config::header_name`][crate::config::Config] header are checked instead of the peer
//!  address.
//!
//!  The `txt` value must be a valid [RFC-8555][RFC-8555] [DNS-01] challenge response. It is
//!  published next to earlier values rather than replacing them.
//!
//!  For successful updates, returns HTTP 200 (OK) and a JSON response body of the form:
//!
//!  ```json
//!  { "txt": "XXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXXX" }
//!  ```
//!  In the response, `txt` contains the echoed `txt` value from the client request.
//!
//!  Every authentication or authorization failure returns HTTP 401 and
//!  `{"error":"forbidden"}`. Invalid values return HTTP 400 with `bad_subdomain` or `bad_txt`,
//!  and storage failures HTTP 500 with `db_error`.
//!
//! ## `/delete` (POST)
//!
//!  Takes the same headers and body as `/update`, and withdraws every published value of the
//!  subdomain equal to `txt`. Responds like `/update`.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4

mod api_error;
mod auth;
mod model;
mod routes;
pub mod server;

pub use server::{new, router, AppState};
