/**
 * Routes Module
 * API route handlers
 */
pub mod auth;
pub mod content;
pub mod dashboard;
pub mod files;
pub mod health;
pub mod middleware;
pub mod portfolio;

use serde::{Deserialize, Serialize};

/// Body of a successful delete.
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}
