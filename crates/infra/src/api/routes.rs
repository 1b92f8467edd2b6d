//! Ordered fallback endpoints
//!
//! Some backend operations have been published under more than one path
//! (`edit_teacher` vs `edit-teacher` vs a REST resource). Until that
//! contract is settled the client tries each candidate in order and keeps
//! the first success. Every fallback is logged so the dead routes can be
//! removed once the backend settles on one.

use lessonhub_domain::{ApiError, Result};

/// Non-empty ordered list of endpoint candidates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRoutes {
    routes: Vec<String>,
}

impl CandidateRoutes {
    /// # Errors
    /// Returns `InvalidRequest` for an empty list.
    pub fn new<I, S>(routes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let routes: Vec<String> = routes.into_iter().map(Into::into).collect();
        if routes.is_empty() {
            return Err(ApiError::invalid_request("At least one candidate route is required"));
        }
        Ok(Self { routes })
    }

    /// Substitute `{name}` in every route
    #[must_use]
    pub fn bind(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        let placeholder = format!("{{{name}}}");
        let value = value.to_string();
        for route in &mut self.routes {
            *route = route.replace(&placeholder, &value);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Known routes for updating a teacher
    pub fn edit_teacher() -> Self {
        Self::known(&[
            "/api/v1/admin/edit_teacher/{id}",
            "/api/v1/admin/edit-teacher/{id}",
            "/api/v1/admin/teachers/{id}",
        ])
    }

    /// Known routes for deleting a teacher
    pub fn delete_teacher() -> Self {
        Self::known(&[
            "/api/v1/admin/delete-teacher/{id}",
            "/api/v1/admin/delete_teacher/{id}",
            "/api/v1/admin/teachers/{id}",
        ])
    }

    /// Known routes for listing teachers
    pub fn list_teachers() -> Self {
        Self::known(&["/api/v1/admin/teachers", "/api/v1/teachers", "/api/v1/admin/teacher"])
    }

    fn known(routes: &[&str]) -> Self {
        Self { routes: routes.iter().map(|route| (*route).to_owned()).collect() }
    }
}
