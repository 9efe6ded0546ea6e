use handlebars::Handlebars;

use crate::error::RenderError;

/// Renders a named template against a JSON context.
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, RenderError>;
}

pub const RESULTS_PARTICIPANT: &str = "results_participant";
pub const RESULTS_TEAM_LEAD: &str = "results_team_lead";
pub const RESULTS_SPONSOR: &str = "results_sponsor";

const RESULTS_PARTICIPANT_TEMPLATE: &str = "\
Hi {{recipient_name}},

The results of {{hackathon_title}} have been published.
{{#if position_label}}
Your team {{team_name}} placed {{position_label}}. Congratulations! Your certificate is ready.
{{else}}
Thank you for taking part with {{team_name}}.
{{/if}}
Winners:
{{#each winners}}
  {{position}}. {{team_name}} ({{average_score}})
{{/each}}
";

const RESULTS_TEAM_LEAD_TEMPLATE: &str = "\
Hi {{recipient_name}},

The results of {{hackathon_title}} have been published.
{{#if position_label}}
{{team_name}} placed {{position_label}}. Every member of your team has been issued a certificate.
{{else}}
{{team_name}} did not place this time. Thank you for leading your team.
{{/if}}
Winners:
{{#each winners}}
  {{position}}. {{team_name}} ({{average_score}})
{{/each}}
";

const RESULTS_SPONSOR_TEMPLATE: &str = "\
Hello {{recipient_name}},

Thank you for sponsoring {{hackathon_title}}. The winners are:
{{#each winners}}
  {{position}}. {{team_name}} with \"{{submission_title}}\" ({{average_score}})
{{/each}}
";

/// Handlebars renderer preloaded with the results templates.
pub struct HandlebarsRenderer {
    handlebars: Handlebars<'static>,
}

impl HandlebarsRenderer {
    pub fn new() -> Result<Self, RenderError> {
        let mut handlebars = Handlebars::new();
        // Plain-text mail; nothing to escape.
        handlebars.register_escape_fn(handlebars::no_escape);
        handlebars.set_strict_mode(false);

        handlebars.register_template_string(RESULTS_PARTICIPANT, RESULTS_PARTICIPANT_TEMPLATE)?;
        handlebars.register_template_string(RESULTS_TEAM_LEAD, RESULTS_TEAM_LEAD_TEMPLATE)?;
        handlebars.register_template_string(RESULTS_SPONSOR, RESULTS_SPONSOR_TEMPLATE)?;

        Ok(Self { handlebars })
    }

    /// Register or replace a template.
    pub fn register(&mut self, name: &str, template: &str) -> Result<(), RenderError> {
        self.handlebars.register_template_string(name, template)?;
        Ok(())
    }
}

impl TemplateRenderer for HandlebarsRenderer {
    fn render(&self, name: &str, context: &serde_json::Value) -> Result<String, RenderError> {
        Ok(self.handlebars.render(name, context)?)
    }
}
