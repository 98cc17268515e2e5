//! Request middleware applied around the router.

pub mod auth;
