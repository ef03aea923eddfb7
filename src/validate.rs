pub mod body;
pub mod parameter;

use crate::diagnostics::{Diagnostic, Report};
use crate::document::{Location, Operation};
use crate::http::{Multimap, Request, Response};
use crate::router::RouteMatch;

pub use body::BodyValidator;
pub use parameter::ParameterValidator;

/// Per-call state of one validation run.
///
/// Created fresh for every request and discarded once the [`Report`] is
/// produced; nothing in here is shared between calls.
#[derive(Debug)]
pub struct ValidationContext<'v> {
    request: &'v Request,
    response: Option<&'v Response>,
    operation: Option<&'v Operation>,
    captures: Vec<(String, String)>,
    diagnostics: Vec<Diagnostic>,
}

impl<'v> ValidationContext<'v> {
    pub fn new(request: &'v Request) -> Self {
        Self {
            request,
            response: None,
            operation: None,
            captures: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Record the routed operation along with its informational messages
    pub fn set_route(&mut self, route: RouteMatch<'v>) {
        let operation = route.operation;
        self.push(Diagnostic::info(format!(
            "API is validated against the Operation: {}",
            operation.display_name()
        )));
        if operation.deprecated {
            let path = self.request.path();
            self.push(Diagnostic::warn(format!("API is deprecated {path}")));
        }
        self.operation = Some(operation);
        self.captures = route.captures;
    }

    pub fn set_response(&mut self, response: &'v Response) {
        self.response = Some(response);
    }

    pub fn request(&self) -> &'v Request {
        self.request
    }

    pub fn response(&self) -> Option<&'v Response> {
        self.response
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn diagnostics_mut(&mut self) -> &mut Vec<Diagnostic> {
        &mut self.diagnostics
    }

    /// Values the request carries for parameters of the given location
    pub fn parameter_values(&self, location: Location) -> Multimap {
        match location {
            Location::Header => self.request.headers().clone(),
            Location::Query => self.request.query_parameters(),
            Location::Path => {
                let mut values = Multimap::new();
                for (name, value) in &self.captures {
                    values.entry(name.clone()).or_default().push(value.clone());
                }
                values
            }
            Location::Cookie => self.request.cookies().clone(),
        }
    }

    pub fn into_report(self) -> Report {
        Report {
            operation: self.operation.map(Operation::display_name),
            diagnostics: self.diagnostics,
        }
    }
}
