//! REST mail API client
//!
//! A token is resolved once, then every resource call carries it in the
//! `Authorization` header.

mod client;
mod token;

pub use client::{Outcome, RestClient, RestClientBuilder, interpret};
pub use token::{
    SCOPES, Token, TokenBodyFormat, TokenClient, TokenFields, decode_token_body, resolve_scope,
    token_from_fields,
};
