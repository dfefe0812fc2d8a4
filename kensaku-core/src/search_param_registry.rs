use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::resource_type::is_resource_type;
use crate::search_param::{SearchParamType, SearchParameterInfo};

/// Read-only source of search parameter definitions.
///
/// Implementations are shared between concurrent requests, so lookups must
/// not mutate state.
pub trait SearchParameterDefinitionManager: Send + Sync {
    /// Look up a parameter by code on a resource type.
    fn get_search_parameter(
        &self,
        resource_type: &str,
        name: &str,
    ) -> Result<Arc<SearchParameterInfo>>;

    /// Look up a parameter by canonical URL (used for composite components).
    fn get_search_parameter_by_url(&self, url: &str) -> Result<Arc<SearchParameterInfo>>;

    fn is_known_resource_type(&self, name: &str) -> bool;

    /// Resource types with at least one specific definition, sorted.
    fn resource_types(&self) -> Vec<String>;

    /// All parameters usable on a resource type, common ones included.
    fn search_parameters(&self, resource_type: &str) -> Vec<Arc<SearchParameterInfo>>;
}

/// In-memory registry of search parameter definitions
#[derive(Debug, Default)]
pub struct SearchParamRegistry {
    /// resource_type → code → definition
    by_resource: HashMap<String, HashMap<String, Arc<SearchParameterInfo>>>,
    by_url: HashMap<String, Arc<SearchParameterInfo>>,
    /// Definitions based on Resource/DomainResource
    common: HashMap<String, Arc<SearchParameterInfo>>,
}

impl SearchParamRegistry {
    /// Create a registry with the built-in R4 definitions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        let builtin = [
            common_definitions(),
            patient_definitions(),
            practitioner_definitions(),
            practitioner_role_definitions(),
            organization_definitions(),
            observation_definitions(),
            encounter_definitions(),
            condition_definitions(),
            diagnostic_report_definitions(),
            medication_request_definitions(),
            immunization_definitions(),
            group_definitions(),
            device_definitions(),
            location_definitions(),
            related_person_definitions(),
            risk_assessment_definitions(),
            value_set_definitions(),
        ];
        for definitions in builtin {
            for info in definitions {
                registry.register(info);
            }
        }

        registry
    }

    /// Create a registry without any definitions
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a definition under its URL and every base resource type.
    /// A later definition with the same key replaces the earlier one.
    pub fn register(&mut self, info: SearchParameterInfo) {
        let info = Arc::new(info);

        if let Some(previous) = self.by_url.insert(info.url.clone(), info.clone()) {
            tracing::debug!("Replacing search parameter definition {}", previous.url);
        }

        if info.is_common() {
            self.common.insert(info.name.clone(), info.clone());
        }

        for base in &info.base {
            if base == "Resource" || base == "DomainResource" {
                continue;
            }
            self.by_resource
                .entry(base.clone())
                .or_default()
                .insert(info.name.clone(), info.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

impl SearchParameterDefinitionManager for SearchParamRegistry {
    fn get_search_parameter(
        &self,
        resource_type: &str,
        name: &str,
    ) -> Result<Arc<SearchParameterInfo>> {
        if !self.is_known_resource_type(resource_type) {
            return Err(SearchError::parameter_not_supported(resource_type, name));
        }

        self.by_resource
            .get(resource_type)
            .and_then(|params| params.get(name))
            .or_else(|| self.common.get(name))
            .cloned()
            .ok_or_else(|| SearchError::parameter_not_supported(resource_type, name))
    }

    fn get_search_parameter_by_url(&self, url: &str) -> Result<Arc<SearchParameterInfo>> {
        self.by_url.get(url).cloned().ok_or_else(|| {
            SearchError::invalid_operation(format!(
                "Search parameter definition '{}' is not registered",
                url
            ))
        })
    }

    fn is_known_resource_type(&self, name: &str) -> bool {
        is_resource_type(name)
    }

    fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.by_resource.keys().cloned().collect();
        types.sort();
        types
    }

    fn search_parameters(&self, resource_type: &str) -> Vec<Arc<SearchParameterInfo>> {
        let specific = self.by_resource.get(resource_type);

        let mut params: Vec<Arc<SearchParameterInfo>> = self
            .common
            .values()
            .filter(|p| specific.is_none_or(|s| !s.contains_key(&p.name)))
            .cloned()
            .collect();
        if let Some(specific) = specific {
            params.extend(specific.values().cloned());
        }
        params.sort_by(|a, b| a.name.cmp(&b.name));
        params
    }
}

// --- Built-in definitions ---

fn url_for(base: &str, name: &str) -> String {
    let code = name.trim_start_matches('_');
    format!("http://hl7.org/fhir/SearchParameter/{}-{}", base, code)
}

fn def(base: &str, name: &str, param_type: SearchParamType) -> SearchParameterInfo {
    SearchParameterInfo::new(name, url_for(base, name), param_type).with_base(&[base])
}

fn reference(base: &str, name: &str, targets: &[&str]) -> SearchParameterInfo {
    def(base, name, SearchParamType::Reference).with_targets(targets)
}

fn composite(base: &str, name: &str, components: &[&str]) -> SearchParameterInfo {
    let urls: Vec<String> = components.iter().map(|c| url_for(base, c)).collect();
    let urls: Vec<&str> = urls.iter().map(|u| u.as_str()).collect();
    def(base, name, SearchParamType::Composite).with_components(&urls)
}

fn common_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Resource", "_id", SearchParamType::Token),
        def("Resource", "_lastUpdated", SearchParamType::Date),
        def("Resource", "_tag", SearchParamType::Token),
        def("Resource", "_security", SearchParamType::Token),
        def("Resource", "_profile", SearchParamType::Uri),
        def("Resource", "_source", SearchParamType::Uri),
    ]
}

fn patient_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Patient", "identifier", SearchParamType::Token),
        def("Patient", "active", SearchParamType::Token),
        def("Patient", "name", SearchParamType::String),
        def("Patient", "family", SearchParamType::String),
        def("Patient", "given", SearchParamType::String),
        def("Patient", "birthdate", SearchParamType::Date),
        def("Patient", "death-date", SearchParamType::Date),
        def("Patient", "gender", SearchParamType::Token),
        def("Patient", "telecom", SearchParamType::Token),
        def("Patient", "address-city", SearchParamType::String),
        reference(
            "Patient",
            "general-practitioner",
            &["Organization", "Practitioner", "PractitionerRole"],
        ),
        reference("Patient", "organization", &["Organization"]),
        reference("Patient", "link", &["Patient", "RelatedPerson"]),
    ]
}

fn practitioner_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Practitioner", "identifier", SearchParamType::Token),
        def("Practitioner", "active", SearchParamType::Token),
        def("Practitioner", "name", SearchParamType::String),
        def("Practitioner", "family", SearchParamType::String),
        def("Practitioner", "given", SearchParamType::String),
        def("Practitioner", "gender", SearchParamType::Token),
    ]
}

fn practitioner_role_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("PractitionerRole", "identifier", SearchParamType::Token),
        def("PractitionerRole", "role", SearchParamType::Token),
        reference("PractitionerRole", "practitioner", &["Practitioner"]),
        reference("PractitionerRole", "organization", &["Organization"]),
    ]
}

fn organization_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Organization", "identifier", SearchParamType::Token),
        def("Organization", "name", SearchParamType::String),
        def("Organization", "type", SearchParamType::Token),
        def("Organization", "address", SearchParamType::String),
        reference("Organization", "partof", &["Organization"]),
    ]
}

fn observation_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Observation", "code", SearchParamType::Token),
        def("Observation", "category", SearchParamType::Token),
        def("Observation", "status", SearchParamType::Token),
        def("Observation", "date", SearchParamType::Date),
        def("Observation", "value-quantity", SearchParamType::Quantity),
        def("Observation", "value-string", SearchParamType::String),
        def("Observation", "value-concept", SearchParamType::Token),
        def("Observation", "component-code", SearchParamType::Token),
        def("Observation", "component-value-quantity", SearchParamType::Quantity),
        reference(
            "Observation",
            "subject",
            &["Device", "Group", "Location", "Patient"],
        ),
        reference("Observation", "patient", &["Patient"]),
        reference("Observation", "encounter", &["Encounter"]),
        reference(
            "Observation",
            "performer",
            &[
                "CareTeam",
                "Organization",
                "Patient",
                "Practitioner",
                "PractitionerRole",
                "RelatedPerson",
            ],
        ),
        reference("Observation", "has-member", &["Observation"]),
        composite(
            "Observation",
            "code-value-quantity",
            &["code", "value-quantity"],
        ),
        composite(
            "Observation",
            "component-code-value-quantity",
            &["component-code", "component-value-quantity"],
        ),
    ]
}

fn encounter_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Encounter", "identifier", SearchParamType::Token),
        def("Encounter", "status", SearchParamType::Token),
        def("Encounter", "class", SearchParamType::Token),
        def("Encounter", "date", SearchParamType::Date),
        reference("Encounter", "subject", &["Group", "Patient"]),
        reference("Encounter", "patient", &["Patient"]),
        reference(
            "Encounter",
            "participant",
            &["Practitioner", "PractitionerRole", "RelatedPerson"],
        ),
        reference("Encounter", "service-provider", &["Organization"]),
    ]
}

fn condition_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Condition", "code", SearchParamType::Token),
        def("Condition", "clinical-status", SearchParamType::Token),
        def("Condition", "onset-date", SearchParamType::Date),
        reference("Condition", "subject", &["Group", "Patient"]),
        reference("Condition", "patient", &["Patient"]),
        reference("Condition", "encounter", &["Encounter"]),
    ]
}

fn diagnostic_report_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("DiagnosticReport", "code", SearchParamType::Token),
        def("DiagnosticReport", "status", SearchParamType::Token),
        def("DiagnosticReport", "date", SearchParamType::Date),
        def("DiagnosticReport", "issued", SearchParamType::Date),
        reference(
            "DiagnosticReport",
            "subject",
            &["Device", "Group", "Location", "Patient"],
        ),
        reference("DiagnosticReport", "patient", &["Patient"]),
        reference("DiagnosticReport", "result", &["Observation"]),
    ]
}

fn medication_request_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("MedicationRequest", "status", SearchParamType::Token),
        def("MedicationRequest", "intent", SearchParamType::Token),
        def("MedicationRequest", "code", SearchParamType::Token),
        def("MedicationRequest", "authoredon", SearchParamType::Date),
        reference("MedicationRequest", "subject", &["Group", "Patient"]),
        reference("MedicationRequest", "patient", &["Patient"]),
        reference(
            "MedicationRequest",
            "requester",
            &[
                "Device",
                "Organization",
                "Patient",
                "Practitioner",
                "PractitionerRole",
                "RelatedPerson",
            ],
        ),
    ]
}

fn immunization_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Immunization", "status", SearchParamType::Token),
        def("Immunization", "date", SearchParamType::Date),
        def("Immunization", "vaccine-code", SearchParamType::Token),
        reference("Immunization", "patient", &["Patient"]),
    ]
}

fn group_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Group", "identifier", SearchParamType::Token),
        def("Group", "code", SearchParamType::Token),
        def("Group", "type", SearchParamType::Token),
        reference(
            "Group",
            "member",
            &["Device", "Group", "Medication", "Patient", "Practitioner", "PractitionerRole", "Substance"],
        ),
    ]
}

fn device_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Device", "identifier", SearchParamType::Token),
        def("Device", "type", SearchParamType::Token),
        def("Device", "status", SearchParamType::Token),
        reference("Device", "patient", &["Patient"]),
        reference("Device", "organization", &["Organization"]),
    ]
}

fn location_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("Location", "identifier", SearchParamType::Token),
        def("Location", "name", SearchParamType::String),
        def("Location", "address", SearchParamType::String),
        def("Location", "type", SearchParamType::Token),
        reference("Location", "organization", &["Organization"]),
        reference("Location", "partof", &["Location"]),
    ]
}

fn related_person_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("RelatedPerson", "identifier", SearchParamType::Token),
        def("RelatedPerson", "name", SearchParamType::String),
        reference("RelatedPerson", "patient", &["Patient"]),
    ]
}

fn risk_assessment_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("RiskAssessment", "probability", SearchParamType::Number),
        def("RiskAssessment", "date", SearchParamType::Date),
        reference("RiskAssessment", "subject", &["Group", "Patient"]),
        reference("RiskAssessment", "patient", &["Patient"]),
    ]
}

fn value_set_definitions() -> Vec<SearchParameterInfo> {
    vec![
        def("ValueSet", "url", SearchParamType::Uri),
        def("ValueSet", "name", SearchParamType::String),
        def("ValueSet", "status", SearchParamType::Token),
        def("ValueSet", "version", SearchParamType::Token),
    ]
}
