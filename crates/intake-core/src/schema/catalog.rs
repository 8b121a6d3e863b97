//! Innovation Voucher application catalog.
//!
//! Maps 1:1 to the Enterprise Ireland Innovation Voucher form. Declaration
//! order is the interview order.

use super::field::{FieldTag, FieldType, SchemaField};
use super::registry::SchemaRegistry;

struct Decl {
    id: &'static str,
    label: &'static str,
    prompt: &'static str,
    field_type: FieldType,
    required: bool,
    tag: FieldTag,
}

/// Display titles for the catalog sections.
pub fn section_title(section: &str) -> &str {
    match section {
        "company" => "Company Information",
        "contacts" => "Contact Details",
        "project" => "Project Details",
        other => other,
    }
}

fn decl(id: &'static str, label: &'static str, prompt: &'static str) -> Decl {
    Decl {
        id,
        label,
        prompt,
        field_type: FieldType::Text,
        required: false,
        tag: FieldTag::Simple,
    }
}

impl Decl {
    fn required(mut self) -> Self {
        self.required = true;
        self
    }

    fn critical(mut self) -> Self {
        self.tag = FieldTag::QualityCritical;
        self
    }

    fn typed(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    fn build(self) -> SchemaField {
        SchemaField {
            id: self.id.to_string(),
            label: self.label.to_string(),
            section: self.id.split('.').next().unwrap_or_default().to_string(),
            prompt: self.prompt.to_string(),
            field_type: self.field_type,
            required: self.required,
            tag: self.tag,
        }
    }
}

/// The Innovation Voucher application registry.
pub fn innovation_voucher() -> SchemaRegistry {
    let decls = vec![
        // Company
        decl("company.legal_name", "Legal name", "What's your company's legal name?").required(),
        decl(
            "company.trading_name",
            "Trading name",
            "Do you trade under a different name, or is it the same as your legal name?",
        ),
        decl("company.cro_number", "CRO number", "What's your CRO number?").required(),
        decl(
            "company.incorporation_date",
            "Incorporation date",
            "When was the company incorporated?",
        ),
        decl(
            "company.registered_address.line1",
            "Address line 1",
            "What's the first line of your registered address?",
        ),
        decl(
            "company.registered_address.line2",
            "Address line 2",
            "Is there a second line for the address, or can we skip that?",
        ),
        decl("company.registered_address.city", "City or town", "What city or town is that in?"),
        decl("company.registered_address.county", "County", "What county is that in?"),
        decl("company.registered_address.eircode", "Eircode", "What's the Eircode?"),
        decl("company.website", "Website", "Do you have a website?"),
        decl(
            "company.primary_activity",
            "Primary activity",
            "What sector or industry does the company operate in?",
        ),
        decl(
            "company.description",
            "Company description",
            "Can you describe what the company does in a sentence or two?",
        ),
        decl(
            "company.employees.full_time",
            "Full-time employees",
            "How many full-time employees do you have?",
        )
        .typed(FieldType::Number),
        decl(
            "company.employees.part_time",
            "Part-time employees",
            "How many part-time employees do you have?",
        )
        .typed(FieldType::Number),
        // Contacts
        decl(
            "contacts.primary.name",
            "Contact name",
            "Who should I put as the main contact for this application?",
        )
        .required(),
        decl("contacts.primary.title", "Job title", "What's their job title?"),
        decl("contacts.primary.email", "Email", "What's their email address?").required(),
        decl("contacts.primary.phone", "Phone", "And what's their phone number?"),
        // Project
        decl(
            "project.title",
            "Project title",
            "Let's talk about the project. What would you call it?",
        )
        .required(),
        decl(
            "project.challenge",
            "Challenge",
            "What's the main problem or challenge you're trying to solve?",
        )
        .required()
        .critical(),
        decl(
            "project.description",
            "Proposed innovation",
            "What's the innovation you're proposing, and what are you aiming to develop?",
        )
        .required()
        .critical(),
        decl(
            "project.technical_uncertainty",
            "Technical uncertainty",
            "What are the technical or knowledge gaps you don't know how to close yet?",
        ),
        decl(
            "project.skills_required",
            "Expertise required",
            "What external expertise or facilities do you need that you don't have in-house?",
        )
        .required()
        .critical(),
        decl(
            "project.objectives",
            "Objectives",
            "What are the main objectives you want this project to achieve?",
        )
        .typed(FieldType::TextList),
        decl(
            "project.deliverables",
            "Deliverables",
            "What will you actually have at the end, such as reports, prototypes or validated findings?",
        )
        .typed(FieldType::TextList)
        .critical(),
        decl(
            "project.commercial_impact",
            "Commercial impact",
            "How will this benefit your company commercially?",
        )
        .critical(),
        decl("project.timeline", "Timeline", "How long do you think this project will take?"),
    ];

    SchemaRegistry::new(decls.into_iter().map(Decl::build).collect())
        .unwrap_or_else(|e| unreachable!("static catalog is well-formed: {e}"))
}
