use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{CollectedRecord, ContentType};

/// Characters of each collected record carried into the prompt.
const RECORD_EXCERPT_CHARS: usize = 2000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSection {
    pub title: String,
    pub description: String,
    pub required: bool,
}

impl TemplateSection {
    fn required(title: &str, description: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            required: true,
        }
    }

    fn optional(title: &str, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(title, description)
        }
    }
}

/// Structure and tone an article of one content type should follow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentTemplate {
    pub content_type: ContentType,
    pub name: String,
    pub description: String,
    pub min_words: u32,
    pub max_words: u32,
    pub sections: Vec<TemplateSection>,
    pub style_guide: String,
}

/// Immutable lookup table of content templates.
///
/// Built once at startup and handed around by reference.
#[derive(Debug, Clone)]
pub struct TemplateRegistry {
    templates: HashMap<ContentType, ContentTemplate>,
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateRegistry {
    /// Registry holding the built-in template for every content type.
    pub fn new() -> Self {
        Self::from_templates(builtin_templates())
    }

    pub fn from_templates(templates: Vec<ContentTemplate>) -> Self {
        Self {
            templates: templates
                .into_iter()
                .map(|t| (t.content_type, t))
                .collect(),
        }
    }

    pub fn get(&self, content_type: ContentType) -> Result<&ContentTemplate> {
        self.templates
            .get(&content_type)
            .ok_or(Error::TemplateNotFound(content_type))
    }

    /// Templates in `ContentType::ALL` order.
    pub fn list(&self) -> Vec<&ContentTemplate> {
        ContentType::ALL
            .iter()
            .filter_map(|ct| self.templates.get(ct))
            .collect()
    }
}

/// Assemble the context block handed to the LLM that writes the article.
pub fn build_prompt_context(
    template: &ContentTemplate,
    topic: Option<&str>,
    source_url: Option<&str>,
    records: &[CollectedRecord],
) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Article template: {}\n", template.name));
    out.push_str(&format!("Type: {}\n", template.content_type));
    out.push_str(&format!(
        "Target length: {}-{} characters\n",
        template.min_words, template.max_words
    ));
    out.push_str(&format!("Style: {}\n\n", template.style_guide));

    out.push_str("## Sections\n");
    for (index, section) in template.sections.iter().enumerate() {
        let optional_mark = if section.required { "" } else { " (optional)" };
        out.push_str(&format!(
            "{}. **{}**{}\n",
            index + 1,
            section.title,
            optional_mark
        ));
        out.push_str(&format!("   {}\n", section.description));
    }
    out.push('\n');

    if let Some(topic) = topic.filter(|t| !t.is_empty()) {
        out.push_str(&format!("## Topic\n{}\n\n", topic));
    }
    if let Some(url) = source_url.filter(|u| !u.is_empty()) {
        out.push_str(&format!("## Reference URL\n{}\n\n", url));
    }
    if !records.is_empty() {
        out.push_str("## Collected data\n");
        for record in records {
            out.push_str(&format!("### [{}] {}\n", record.source, record.title));
            if let Some(url) = &record.url {
                out.push_str(&format!("URL: {}\n", url));
            }
            let excerpt: String = record.content.chars().take(RECORD_EXCERPT_CHARS).collect();
            out.push_str(&excerpt);
            out.push_str("\n\n");
        }
    }

    out
}

fn builtin_templates() -> Vec<ContentTemplate> {
    use TemplateSection as S;

    let polite = "Polite register (です・ます調). Keep the main title within about 30 characters and move supplementary detail into the subtitle.";

    vec![
        ContentTemplate {
            content_type: ContentType::WeeklyAiNews,
            name: "Weekly AI news highlights".to_string(),
            description: "Roundup of the week's notable AI news".to_string(),
            min_words: 3000,
            max_words: 5000,
            sections: vec![
                S::required("This week's highlights", "The two or three stories that matter most"),
                S::required("News roundup", "Each major story with a short explanation and source link"),
                S::required("Industry trends", "Patterns that connect this week's stories"),
                S::optional("New services and tools", "Launches worth trying"),
                S::required("Wrap-up and next week", "Summary and what to watch next"),
            ],
            style_guide: format!("{} Cite every news item with its source URL.", polite),
        },
        ContentTemplate {
            content_type: ContentType::PaperReview,
            name: "Paper review".to_string(),
            description: "Explains one research paper for practitioners".to_string(),
            min_words: 5000,
            max_words: 8000,
            sections: vec![
                S::required("Paper overview", "Title, authors, venue and the one-line contribution"),
                S::required("Background and problem", "What was unsolved before this work"),
                S::required("Proposed method", "How the method works, with figures or formulas"),
                S::required("Experiments", "Datasets, baselines and headline numbers"),
                S::required("Discussion and impact", "Limitations and why the result matters"),
                S::required("Summary", "Key takeaways"),
            ],
            style_guide: format!("{} Explain jargon on first use.", polite),
        },
        ContentTemplate {
            content_type: ContentType::ProjectIntro,
            name: "GitHub project introduction".to_string(),
            description: "Introduces an open-source repository".to_string(),
            min_words: 3000,
            max_words: 5000,
            sections: vec![
                S::required("Project overview", "What the project does and who it is for"),
                S::required("Tech stack and architecture", "Languages, frameworks and structure"),
                S::required("Installation and usage", "Commands to get started"),
                S::required("Notable features and design", "What sets it apart"),
                S::required("Summary and recommendation", "Who should try it"),
            ],
            style_guide: format!("{} Include runnable command examples.", polite),
        },
        ContentTemplate {
            content_type: ContentType::ToolTips,
            name: "Tools and tips".to_string(),
            description: "Hands-on introduction to a tool or technique".to_string(),
            min_words: 3000,
            max_words: 5000,
            sections: vec![
                S::required("Introduction", "The problem the tool solves"),
                S::required("Setup", "Installation and configuration"),
                S::required("Basic usage", "The everyday workflow"),
                S::required("Practical examples", "Realistic use cases"),
                S::optional("Summary and comparison", "How it compares with alternatives"),
            ],
            style_guide: format!("{} Prefer short code samples over prose.", polite),
        },
        ContentTemplate {
            content_type: ContentType::MarketAnalysis,
            name: "AI x equity and company analysis".to_string(),
            description: "Company or market analysis using AI techniques".to_string(),
            min_words: 3000,
            max_words: 8000,
            sections: vec![
                S::required("Subject overview", "Company or market under analysis"),
                S::required("Analysis method", "Models and data used"),
                S::required("Findings", "Results with charts or tables"),
                S::required("Market context", "How the findings relate to current trends"),
                S::required("Summary and investor view", "Takeaways, not investment advice"),
            ],
            style_guide: format!("{} State clearly that nothing is investment advice.", polite),
        },
        ContentTemplate {
            content_type: ContentType::MlPractice,
            name: "AI x data analysis and ML engineering".to_string(),
            description: "Practical machine-learning project walkthrough".to_string(),
            min_words: 3000,
            max_words: 8000,
            sections: vec![
                S::required("Problem statement", "The task and success metric"),
                S::required("Data preparation", "Collection, cleaning and features"),
                S::required("Model design and implementation", "Architecture and code"),
                S::required("Evaluation", "Metrics and error analysis"),
                S::optional("Production notes", "Deployment and monitoring lessons"),
                S::required("Summary and lessons", "What worked and what did not"),
            ],
            style_guide: format!("{} Show code for every non-trivial step.", polite),
        },
        ContentTemplate {
            content_type: ContentType::Cv,
            name: "Image recognition and computer vision".to_string(),
            description: "Computer-vision technique explained with code".to_string(),
            min_words: 3000,
            max_words: 8000,
            sections: vec![
                S::required("Technique overview", "What the technique does"),
                S::required("Algorithm and model", "How it works internally"),
                S::required("Implementation", "Code example"),
                S::required("Visualization and evaluation", "Sample outputs and metrics"),
                S::required("Summary and applications", "Where to apply it"),
            ],
            style_guide: format!("{} Include input and output images where possible.", polite),
        },
        ContentTemplate {
            content_type: ContentType::Feature,
            name: "Feature article".to_string(),
            description: "Long-form deep dive into one theme".to_string(),
            min_words: 15000,
            max_words: 20000,
            sections: vec![
                S::required("Introduction", "Why the theme matters and how the article is organized"),
                S::required("Background and history", "How the field got here"),
                S::required("Current state", "Technology, market and industry from several angles"),
                S::required("Deep dive, part 1", "The core of the theme"),
                S::required("Deep dive, part 2", "The theme from another angle"),
                S::required("Practice and case studies", "Real examples or hands-on content"),
                S::required("Outlook", "Expected developments"),
                S::required("Summary", "Recap and message to readers"),
            ],
            style_guide: format!(
                "{} Use a table of contents and subheadings so readers can start anywhere.",
                polite
            ),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_covers_every_content_type() {
        let registry = TemplateRegistry::new();
        for ct in ContentType::ALL {
            let template = registry.get(ct).unwrap();
            assert_eq!(template.content_type, ct);
            assert!(!template.sections.is_empty());
            assert!(template.min_words < template.max_words);
        }
        assert_eq!(registry.list().len(), 8);
    }

    #[test]
    fn test_custom_registry_reports_missing_template() {
        let registry = TemplateRegistry::from_templates(vec![]);
        let err = registry.get(ContentType::Cv).unwrap_err();
        assert!(matches!(err, Error::TemplateNotFound(ContentType::Cv)));
    }

    #[test]
    fn test_prompt_context_lists_sections_and_records() {
        let registry = TemplateRegistry::new();
        let template = registry.get(ContentType::ToolTips).unwrap();
        let records = vec![
            CollectedRecord::new("github", "owner/repo", "repo details")
                .with_url("https://github.com/owner/repo"),
            CollectedRecord::new("web_search", "No link", "snippet"),
        ];

        let context = build_prompt_context(
            template,
            Some("ripgrep tips"),
            Some("https://example.com"),
            &records,
        );

        assert!(context.starts_with("# Article template: Tools and tips"));
        assert!(context.contains("Type: tool-tips"));
        assert!(context.contains("1. **Introduction**"));
        assert!(context.contains("5. **Summary and comparison** (optional)"));
        assert!(context.contains("## Topic\nripgrep tips"));
        assert!(context.contains("## Reference URL\nhttps://example.com"));
        assert!(context.contains("### [github] owner/repo\nURL: https://github.com/owner/repo"));
        assert!(context.contains("### [web_search] No link\nsnippet"));
    }

    #[test]
    fn test_prompt_context_truncates_long_records() {
        let registry = TemplateRegistry::new();
        let template = registry.get(ContentType::Feature).unwrap();
        let long = "あ".repeat(RECORD_EXCERPT_CHARS + 500);
        let records = vec![CollectedRecord::new("url_fetcher", "Long", long)];

        let context = build_prompt_context(template, None, None, &records);

        let kept = context.matches('あ').count();
        assert_eq!(kept, RECORD_EXCERPT_CHARS);
        assert!(!context.contains("## Topic"));
    }
}
