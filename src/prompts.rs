use crate::error::BackendError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub name: &'static str,
    pub input_variables: &'static [&'static str],
    pub template: &'static str,
}

pub type PromptVariables<'a> = BTreeMap<&'static str, &'a str>;

impl PromptTemplate {
    /// Substitutes every `{variable}` placeholder. All declared variables must be supplied.
    pub fn render(&self, variables: &PromptVariables<'_>) -> Result<String, BackendError> {
        let mut prompt = self.template.to_string();
        for name in self.input_variables {
            let value = variables
                .get(name)
                .ok_or_else(|| BackendError::MissingVariable {
                    template: self.name.to_string(),
                    variable: (*name).to_string(),
                })?;
            prompt = prompt.replace(&format!("{{{}}}", name), value);
        }
        Ok(prompt)
    }
}

pub const DOCUMENT_TEXT: &str = "document_text";
pub const COMPLIANCE_REPORT: &str = "compliance_report";

pub const ANALYSIS: PromptTemplate = PromptTemplate {
    name: "analysis",
    input_variables: &[DOCUMENT_TEXT],
    template: "You are an AI expert in English guidelines compliance. Analyze the document for:
- Grammar mistakes
- Passive voice overuse
- Clarity issues
- Adherence to formal writing guidelines
- Sentence structure problems
Return a structured compliance report highlighting any mistakes found.
Return ONLY the compliance report. Do not include any additional commentary.
Document Text:
{document_text}
",
};

pub const REVISION: PromptTemplate = PromptTemplate {
    name: "revision",
    input_variables: &[DOCUMENT_TEXT, COMPLIANCE_REPORT],
    template: "You are an AI expert in English writing. Modify the following document to correct the issues found in the compliance report.
Ensure the modified content is clear, grammatically correct, and adheres to formal writing guidelines.
Return ONLY the corrected document text. Do not include any additional explanations or headers.
Compliance Report:
{compliance_report}
Document Text:
{document_text}
",
};
