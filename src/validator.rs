use crate::diagnostics::{Diagnostic, Report};
use crate::document::{self, Content, Document, Location, Operation};
use crate::error::LoadError;
use crate::http::{Request, Response};
use crate::resolver::SchemaResolver;
use crate::router::{CaptureMode, PathRouter};
use crate::validate::{BodyValidator, ParameterValidator, ValidationContext};
use log::{debug, info};
use oas3::spec::Spec;
use serde_json::Value;
use std::fmt::Display;

/// Builder for [`Validator`]
#[derive(Debug, Default)]
pub struct ValidatorBuilder {
    document: Option<Document>,
    capture_mode: CaptureMode,
    servers: Option<Vec<String>>,
}

impl ValidatorBuilder {
    pub fn document(mut self, document: Document) -> Self {
        self.document = Some(document);
        self
    }

    pub fn spec(self, spec: &Spec) -> Self {
        self.document(Document::from_spec(spec))
    }

    /// Read the contract from a file path or http(s) URL
    pub fn location(self, location: &str) -> Result<Self, LoadError> {
        Ok(self.document(document::from_location(location)?))
    }

    pub fn capture_mode(mut self, mode: CaptureMode) -> Self {
        self.capture_mode = mode;
        self
    }

    /// Replace the document's `servers` base URLs for routing
    pub fn servers(mut self, servers: Vec<String>) -> Self {
        self.servers = Some(servers);
        self
    }

    pub fn build(self) -> Result<Validator, LoadError> {
        let document = self.document.ok_or(LoadError::MissingDocument)?;
        let servers = self.servers.unwrap_or_else(|| document.servers.clone());
        let router = PathRouter::new(&document, &servers, self.capture_mode)?;

        info!(
            "Validator ready: {} paths, {} servers, {} component schemas",
            document.paths.len(),
            servers.len(),
            document.schemas.len()
        );
        Ok(Validator { document, router })
    }
}

/// Checks requests and responses against one OpenAPI contract.
///
/// Immutable after construction; `validate` may be called concurrently.
#[derive(Debug)]
pub struct Validator {
    document: Document,
    router: PathRouter,
}

impl Validator {
    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::default()
    }

    pub fn new(document: Document) -> Result<Self, LoadError> {
        Self::builder().document(document).build()
    }

    pub fn from_location(location: &str) -> Result<Self, LoadError> {
        Self::builder().location(location)?.build()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Validate a request and, when supplied, its response
    pub fn validate(&self, request: &Request, response: Option<&Response>) -> Report {
        let mut context = ValidationContext::new(request);
        let Some(operation) = self.route(&mut context) else {
            return context.into_report();
        };

        self.validate_request(&mut context, operation);
        if let Some(response) = response {
            context.set_response(response);
            self.validate_response(&mut context, operation);
        }
        context.into_report()
    }

    /// Validate a request, obtain its response through `fetch`, then
    /// validate the response. A failed fetch is recorded and response
    /// checks are skipped. Nothing is fetched for unrouted requests.
    pub fn validate_exchange<F, E>(&self, request: &Request, fetch: F) -> Report
    where
        F: FnOnce(&Request) -> Result<Response, E>,
        E: Display,
    {
        let mut fetched = None;
        let mut context = ValidationContext::new(request);
        let Some(operation) = self.route(&mut context) else {
            return context.into_report();
        };

        self.validate_request(&mut context, operation);
        match fetch(request) {
            Ok(response) => {
                context.set_response(fetched.insert(response));
                self.validate_response(&mut context, operation);
            }
            Err(err) => context.push(Diagnostic::error(format!(
                "Error Occurred requesting API : {err}"
            ))),
        }
        context.into_report()
    }

    fn route<'v>(&'v self, context: &mut ValidationContext<'v>) -> Option<&'v Operation> {
        let request = context.request();
        let url = request.url_without_query();

        match self
            .router
            .find(&self.document, request.method(), &url, request.path())
        {
            Ok(route) => {
                let operation = route.operation;
                context.set_route(route);
                Some(operation)
            }
            Err(err) => {
                debug!("Routing failed: {err}");
                context.push(Diagnostic::error(err.to_string()));
                None
            }
        }
    }

    fn resolver(&self) -> SchemaResolver<'_> {
        SchemaResolver::new(&self.document.schemas)
    }

    fn validate_request(&self, context: &mut ValidationContext<'_>, operation: &Operation) {
        let parameters = ParameterValidator::new(self.resolver());
        for location in Location::ALL {
            let values = context.parameter_values(location);
            parameters.validate(
                operation.parameters_in(location),
                &values,
                context.diagnostics_mut(),
            );
        }

        let body = context.request().body().filter(|body| !body.trim().is_empty());
        match (&operation.request_body, body) {
            (Some(spec), None) if spec.required => {
                context.push(Diagnostic::error("request body is required"));
            }
            (Some(spec), Some(text)) => {
                self.validate_content(context, "body", "Request body", &spec.content, text);
            }
            (None, Some(_)) => context.push(Diagnostic::warn(format!(
                "Request body supplied but no request body is defined for the Operation: {}",
                operation.display_name()
            ))),
            (Some(_), None) | (None, None) => {}
        }
    }

    fn validate_response(&self, context: &mut ValidationContext<'_>, operation: &Operation) {
        let Some(response) = context.response() else {
            return;
        };
        let Some(spec) = operation.response_for(response.status) else {
            context.push(Diagnostic::warn(format!(
                "No Response schema defined for status code : {}",
                response.status
            )));
            return;
        };

        ParameterValidator::new(self.resolver()).validate(
            &spec.headers,
            response.headers(),
            context.diagnostics_mut(),
        );

        if response.body.trim().is_empty() {
            return;
        }
        if spec.content.is_empty() {
            context.push(Diagnostic::warn(format!(
                "No Response schema defined for status code : {}",
                response.status
            )));
            return;
        }
        self.validate_content(context, "root", "Response body", &spec.content, &response.body);
    }

    /// Parse a body as JSON and check it against the content's JSON schema
    fn validate_content(
        &self,
        context: &mut ValidationContext<'_>,
        root: &str,
        subject: &str,
        content: &Content,
        text: &str,
    ) {
        let Some((media_type, schema)) = content.json() else {
            let declared: Vec<&str> = content.media_types().collect();
            context.push(Diagnostic::ignored(format!(
                "{subject} not validated: no JSON media type among [{}]",
                declared.join(", ")
            )));
            return;
        };
        let Some(schema) = schema else {
            debug!("{subject} has no schema for {media_type}");
            return;
        };

        match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                let body = BodyValidator::new(self.resolver());
                context.extend(body.validate(root, schema, Some(&value)));
            }
            Err(err) => context.push(Diagnostic::error(format!("Not a valid JSON Object: {err}"))),
        }
    }
}
