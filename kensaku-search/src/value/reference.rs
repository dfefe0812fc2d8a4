//! Reference search values.
//!
//! - `123` -> id only, any type
//! - `Patient/123` -> typed, local
//! - `Patient/123/_history/2` -> typed, versioned
//! - `http://server/fhir/Patient/123` -> internal when the server base URL
//!   matches, external otherwise
//! - `urn:uuid:...` -> external, opaque

use kensaku_core::{is_resource_type, SearchParameterDefinitionManager};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use url::Url;

use super::{unescape, ValueParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ReferenceKind {
    Internal,
    External,
    InternalOrExternal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSearchValue {
    pub kind: ReferenceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    pub resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Parses reference literals. Shared across compilations, so implementations
/// must be stateless or internally synchronised.
pub trait ReferenceSearchValueParser: Send + Sync {
    fn parse(&self, literal: &str) -> Result<ReferenceSearchValue, ValueParseError>;
}

#[derive(Clone, Default)]
pub struct DefaultReferenceParser {
    base_url: Option<Url>,
    /// Source of known resource types; the FHIR R4 list when unset
    definitions: Option<Arc<dyn SearchParameterDefinitionManager>>,
}

impl DefaultReferenceParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute references under `base_url` are treated as local.
    pub fn with_base_url(base_url: &str) -> Result<Self, url::ParseError> {
        let mut url = Url::parse(base_url)?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: Some(url),
            definitions: None,
        })
    }

    /// Check resource types in references against `definitions`.
    pub fn with_definitions(mut self, definitions: Arc<dyn SearchParameterDefinitionManager>) -> Self {
        self.definitions = Some(definitions);
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    fn is_known_type(&self, name: &str) -> bool {
        match &self.definitions {
            Some(definitions) => definitions.is_known_resource_type(name),
            None => is_resource_type(name),
        }
    }

    /// Path of `url` below the base URL. Scheme, host and port are compared
    /// after normalisation, so `HTTP://HOST:80/` matches `http://host/`.
    fn local_path<'a>(&self, url: &'a Url) -> Option<&'a str> {
        let base = self.base_url.as_ref()?;
        if url.scheme() != base.scheme()
            || url.host_str() != base.host_str()
            || url.port_or_known_default() != base.port_or_known_default()
            || url.query().is_some()
            || url.fragment().is_some()
        {
            return None;
        }
        url.path().strip_prefix(base.path())
    }

    /// `id`, `Type/id` or `Type/id/_history/vid`
    fn parse_relative(&self, s: &str) -> Option<RelativeParts> {
        let segments: Vec<&str> = s.split('/').collect();
        match segments.as_slice() {
            [id] if valid_segment(id) => Some((None, id.to_string(), None)),
            [rt, id] if self.is_known_type(rt) && valid_segment(id) => {
                Some((Some(rt.to_string()), id.to_string(), None))
            }
            [rt, id, "_history", vid]
                if self.is_known_type(rt) && valid_segment(id) && valid_segment(vid) =>
            {
                Some((Some(rt.to_string()), id.to_string(), Some(vid.to_string())))
            }
            _ => None,
        }
    }

    /// `http://other/fhir/Patient/1/_history/2` -> (`http://other/fhir/`, Patient, 1, Some(2))
    fn split_absolute(&self, s: &str) -> Option<(String, String, String, Option<String>)> {
        let (rest, version) = match s.rsplit_once("/_history/") {
            Some((rest, vid)) if valid_segment(vid) => (rest, Some(vid.to_string())),
            _ => (s, None),
        };
        let (rest, id) = rest.rsplit_once('/')?;
        let (base, resource_type) = rest.rsplit_once('/')?;
        if !self.is_known_type(resource_type) || !valid_segment(id) {
            return None;
        }
        Some((
            format!("{}/", base),
            resource_type.to_string(),
            id.to_string(),
            version,
        ))
    }
}

impl fmt::Debug for DefaultReferenceParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultReferenceParser")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ReferenceSearchValueParser for DefaultReferenceParser {
    fn parse(&self, literal: &str) -> Result<ReferenceSearchValue, ValueParseError> {
        let literal = unescape(literal)?;
        if literal.is_empty() {
            return Err(ValueParseError::Empty);
        }
        let invalid = || ValueParseError::Reference(literal.to_string());

        let absolute = Url::parse(&literal)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https" | "urn"));

        let Some(url) = absolute else {
            let (resource_type, resource_id, version) =
                self.parse_relative(&literal).ok_or_else(invalid)?;
            return Ok(ReferenceSearchValue {
                kind: ReferenceKind::InternalOrExternal,
                base_uri: None,
                resource_type,
                resource_id,
                version,
            });
        };

        if let Some(local) = self.local_path(&url) {
            let (resource_type, resource_id, version) =
                self.parse_relative(local).ok_or_else(invalid)?;
            return Ok(ReferenceSearchValue {
                kind: ReferenceKind::Internal,
                base_uri: None,
                resource_type,
                resource_id,
                version,
            });
        }

        if !url.cannot_be_a_base()
            && let Some((base_uri, resource_type, resource_id, version)) =
                self.split_absolute(&literal)
        {
            return Ok(ReferenceSearchValue {
                kind: ReferenceKind::External,
                base_uri: Some(base_uri),
                resource_type: Some(resource_type),
                resource_id,
                version,
            });
        }

        Ok(ReferenceSearchValue {
            kind: ReferenceKind::External,
            base_uri: None,
            resource_type: None,
            resource_id: literal.into_owned(),
            version: None,
        })
    }
}

type RelativeParts = (Option<String>, String, Option<String>);

fn valid_segment(s: &str) -> bool {
    !s.is_empty() && !s.contains('/')
}

impl fmt::Display for ReferenceSearchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(base) = &self.base_uri {
            f.write_str(base)?;
        }
        if let Some(rt) = &self.resource_type {
            write!(f, "{}/", rt)?;
        }
        f.write_str(&self.resource_id)?;
        if let Some(version) = &self.version {
            write!(f, "/_history/{}", version)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_only() {
        let r = DefaultReferenceParser::new().parse("123").unwrap();
        assert_eq!(r.kind, ReferenceKind::InternalOrExternal);
        assert_eq!(r.resource_type, None);
        assert_eq!(r.resource_id, "123");
    }

    #[test]
    fn test_typed_relative() {
        let r = DefaultReferenceParser::new().parse("Patient/123").unwrap();
        assert_eq!(r.kind, ReferenceKind::InternalOrExternal);
        assert_eq!(r.resource_type.as_deref(), Some("Patient"));
        assert_eq!(r.resource_id, "123");
        assert_eq!(r.to_string(), "Patient/123");
    }

    #[test]
    fn test_versioned() {
        let r = DefaultReferenceParser::new()
            .parse("Patient/123/_history/2")
            .unwrap();
        assert_eq!(r.version.as_deref(), Some("2"));
        assert_eq!(r.to_string(), "Patient/123/_history/2");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = DefaultReferenceParser::new().parse("Foo/123").unwrap_err();
        assert!(matches!(err, ValueParseError::Reference(_)));
    }

    #[test]
    fn test_internal_absolute() {
        let parser = DefaultReferenceParser::with_base_url("http://localhost:8080/fhir").unwrap();
        let r = parser.parse("http://localhost:8080/fhir/Patient/123").unwrap();
        assert_eq!(r.kind, ReferenceKind::Internal);
        assert_eq!(r.base_uri, None);
        assert_eq!(r.resource_type.as_deref(), Some("Patient"));
        assert_eq!(r.resource_id, "123");
    }

    #[test]
    fn test_internal_absolute_is_normalised() {
        let parser = DefaultReferenceParser::with_base_url("http://localhost:8080/fhir").unwrap();
        let r = parser.parse("HTTP://LOCALHOST:8080/fhir/Patient/123").unwrap();
        assert_eq!(r.kind, ReferenceKind::Internal);
        assert_eq!(r.resource_id, "123");

        let parser = DefaultReferenceParser::with_base_url("https://fhir.example.org/r4").unwrap();
        let r = parser.parse("https://fhir.example.org:443/r4/Patient/7/_history/1").unwrap();
        assert_eq!(r.kind, ReferenceKind::Internal);
        assert_eq!(r.version.as_deref(), Some("1"));

        let r = parser.parse("https://fhir.example.org:8443/r4/Patient/7").unwrap();
        assert_eq!(r.kind, ReferenceKind::External);
    }

    #[test]
    fn test_external_absolute() {
        let parser = DefaultReferenceParser::with_base_url("http://localhost:8080/fhir/").unwrap();
        let r = parser
            .parse("https://other.example.org/r4/Practitioner/abc/_history/7")
            .unwrap();
        assert_eq!(r.kind, ReferenceKind::External);
        assert_eq!(r.base_uri.as_deref(), Some("https://other.example.org/r4/"));
        assert_eq!(r.resource_type.as_deref(), Some("Practitioner"));
        assert_eq!(r.resource_id, "abc");
        assert_eq!(r.version.as_deref(), Some("7"));
    }

    #[test]
    fn test_opaque_urn() {
        let r = DefaultReferenceParser::new()
            .parse("urn:uuid:0c3151bd-1cbf-4d64-b04d-cd9187a4c6e0")
            .unwrap();
        assert_eq!(r.kind, ReferenceKind::External);
        assert_eq!(r.resource_type, None);
        assert_eq!(r.resource_id, "urn:uuid:0c3151bd-1cbf-4d64-b04d-cd9187a4c6e0");
    }

    /// Knows only `Spaceship`
    struct ShipTypes;

    impl SearchParameterDefinitionManager for ShipTypes {
        fn get_search_parameter(
            &self,
            resource_type: &str,
            name: &str,
        ) -> kensaku_core::Result<Arc<kensaku_core::SearchParameterInfo>> {
            Err(kensaku_core::SearchError::parameter_not_supported(resource_type, name))
        }

        fn get_search_parameter_by_url(
            &self,
            url: &str,
        ) -> kensaku_core::Result<Arc<kensaku_core::SearchParameterInfo>> {
            Err(kensaku_core::SearchError::invalid_operation(url))
        }

        fn is_known_resource_type(&self, name: &str) -> bool {
            name == "Spaceship"
        }

        fn resource_types(&self) -> Vec<String> {
            vec!["Spaceship".to_string()]
        }

        fn search_parameters(&self, _resource_type: &str) -> Vec<Arc<kensaku_core::SearchParameterInfo>> {
            Vec::new()
        }
    }

    #[test]
    fn test_resource_types_from_definitions() {
        let parser = DefaultReferenceParser::new().with_definitions(Arc::new(ShipTypes));

        let r = parser.parse("Spaceship/1").unwrap();
        assert_eq!(r.resource_type.as_deref(), Some("Spaceship"));
        assert!(matches!(parser.parse("Patient/1"), Err(ValueParseError::Reference(_))));

        let r = parser.parse("https://other.example.org/Spaceship/9").unwrap();
        assert_eq!(r.kind, ReferenceKind::External);
        assert_eq!(r.resource_type.as_deref(), Some("Spaceship"));
    }

    #[test]
    fn test_empty() {
        assert_eq!(DefaultReferenceParser::new().parse(""), Err(ValueParseError::Empty));
    }
}
