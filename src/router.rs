use crate::document::{Document, Operation, PathItem};
use crate::error::{LoadError, RouteError};
use log::{debug, info};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static TEMPLATE_PARAMETER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^}]+)\}").expect("valid regex"));

/// How a `{name}` placeholder matches a concrete path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// One path segment: `[^/]+`
    #[default]
    Segment,
    /// Anything, including `/`: `.*`
    Greedy,
}

/// A compiled `server + template` key
#[derive(Debug)]
struct TemplateEntry {
    key: String,
    regex: Regex,
    names: Vec<String>,
    item: usize,
}

/// Result of routing a request
#[derive(Debug, Clone)]
pub struct RouteMatch<'d> {
    pub item: &'d PathItem,
    pub operation: &'d Operation,
    /// Path parameter values in placeholder order
    pub captures: Vec<(String, String)>,
}

/// Maps (method, URL) to an operation. Built once, read-only afterwards.
#[derive(Debug)]
pub struct PathRouter {
    literal: HashMap<String, usize>,
    templated: Vec<TemplateEntry>,
}

impl PathRouter {
    /// Build route tables for every `server + path` combination.
    /// With no servers, bare path templates are used.
    pub fn new(document: &Document, servers: &[String], mode: CaptureMode) -> Result<Self, LoadError> {
        let bases: Vec<&str> = if servers.is_empty() {
            vec![""]
        } else {
            servers.iter().map(|s| s.trim_end_matches('/')).collect()
        };

        let mut literal = HashMap::new();
        let mut templated = Vec::new();

        for (index, item) in document.paths.iter().enumerate() {
            for base in &bases {
                let key = format!("{}{}", base, item.template);
                if item.is_templated() {
                    let (regex, names) = compile_template(&key, mode)?;
                    debug!("Compiled route {} as {}", key, regex.as_str());
                    templated.push(TemplateEntry {
                        key,
                        regex,
                        names,
                        item: index,
                    });
                } else {
                    literal.entry(key).or_insert(index);
                }
            }
        }

        Ok(Self { literal, templated })
    }

    /// Find the operation for a request.
    ///
    /// The full URL (without query) is tried first, then the bare path.
    /// Literal keys win over templates; templates are tried in declaration
    /// order and the first full match wins.
    pub fn find<'d>(
        &self,
        document: &'d Document,
        method: &str,
        url: &str,
        path: &str,
    ) -> Result<RouteMatch<'d>, RouteError> {
        let candidates: Vec<&str> = if url == path { vec![url] } else { vec![url, path] };

        let found = candidates
            .iter()
            .find_map(|candidate| {
                self.literal
                    .get(*candidate)
                    .map(|index| (*index, Vec::new()))
            })
            .or_else(|| {
                candidates
                    .iter()
                    .find_map(|candidate| self.match_template(candidate))
            });

        let Some((index, captures)) = found else {
            return Err(RouteError::PathNotFound {
                url: url.to_string(),
            });
        };

        let item = &document.paths[index];
        let operation = item.operation(method).ok_or_else(|| RouteError::MethodNotFound {
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
        })?;

        info!("Route {} {} matched {}", method, url, item.template);
        Ok(RouteMatch {
            item,
            operation,
            captures,
        })
    }

    fn match_template(&self, candidate: &str) -> Option<(usize, Vec<(String, String)>)> {
        self.templated.iter().find_map(|entry| {
            let groups = entry.regex.captures(candidate)?;
            debug!("{} matched template {}", candidate, entry.key);
            let captures = entry
                .names
                .iter()
                .enumerate()
                .map(|(position, name)| {
                    let value = groups
                        .get(position + 1)
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default();
                    (name.clone(), value)
                })
                .collect();
            Some((entry.item, captures))
        })
    }
}

/// Compile a templated key into an anchored regex with one positional
/// group per `{name}` placeholder. Literal text is escaped.
pub fn compile_template(template: &str, mode: CaptureMode) -> Result<(Regex, Vec<String>), LoadError> {
    let group = match mode {
        CaptureMode::Segment => "([^/]+)",
        CaptureMode::Greedy => "(.*)",
    };

    let mut pattern = String::from("^");
    let mut names = Vec::new();
    let mut last = 0;

    for placeholder in TEMPLATE_PARAMETER.captures_iter(template) {
        let (Some(whole), Some(name)) = (placeholder.get(0), placeholder.get(1)) else {
            continue;
        };
        pattern.push_str(&regex::escape(&template[last..whole.start()]));
        pattern.push_str(group);
        names.push(name.as_str().to_string());
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&template[last..]));
    pattern.push('$');

    let regex = Regex::new(&pattern).map_err(|source| LoadError::Template {
        template: template.to_string(),
        source,
    })?;
    Ok((regex, names))
}
