//! Evaluation units: single-turn test cases and conversations.

use serde::{Deserialize, Serialize};

/// A field of a [`TestCase`] an evaluation can declare as relevant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestCaseParam {
    Input,
    ActualOutput,
    ExpectedOutput,
    Context,
    RetrievalContext,
}

impl TestCaseParam {
    /// Human-readable label used in prompts.
    pub fn label(self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::ActualOutput => "Actual Output",
            Self::ExpectedOutput => "Expected Output",
            Self::Context => "Context",
            Self::RetrievalContext => "Retrieval Context",
        }
    }
}

impl std::fmt::Display for TestCaseParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Join param labels as an English list: `"Input, Actual Output, and Context"`.
pub fn params_phrase(params: &[TestCaseParam]) -> String {
    let labels: Vec<&str> = params.iter().map(|p| p.label()).collect();
    match labels.as_slice() {
        [] => String::new(),
        [only] => (*only).to_string(),
        [first, second] => format!("{first} and {second}"),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

/// A single-turn evaluation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub actual_output: Option<String>,
    pub expected_output: Option<String>,
    pub context: Option<Vec<String>>,
    pub retrieval_context: Option<Vec<String>>,
    /// Optional label used in logs.
    pub name: Option<String>,
}

impl TestCase {
    pub fn new(input: impl Into<String>, actual_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            actual_output: Some(actual_output.into()),
            expected_output: None,
            context: None,
            retrieval_context: None,
            name: None,
        }
    }

    pub fn with_expected_output(mut self, expected: impl Into<String>) -> Self {
        self.expected_output = Some(expected.into());
        self
    }

    pub fn with_context(mut self, context: Vec<String>) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_retrieval_context(mut self, retrieval_context: Vec<String>) -> Self {
        self.retrieval_context = Some(retrieval_context);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Render one field for a prompt, or `None` if the field is absent.
    ///
    /// List fields are rendered as JSON arrays.
    pub fn render_param(&self, param: TestCaseParam) -> Option<String> {
        match param {
            TestCaseParam::Input => Some(self.input.clone()),
            TestCaseParam::ActualOutput => self.actual_output.clone(),
            TestCaseParam::ExpectedOutput => self.expected_output.clone(),
            TestCaseParam::Context => self.context.as_ref().map(|c| render_list(c)),
            TestCaseParam::RetrievalContext => {
                self.retrieval_context.as_ref().map(|c| render_list(c))
            }
        }
    }

    /// Whether `param` is present and non-empty.
    pub fn has_param(&self, param: TestCaseParam) -> bool {
        fn filled(text: Option<&String>) -> bool {
            text.is_some_and(|t| !t.trim().is_empty())
        }
        match param {
            TestCaseParam::Input => filled(Some(&self.input)),
            TestCaseParam::ActualOutput => filled(self.actual_output.as_ref()),
            TestCaseParam::ExpectedOutput => filled(self.expected_output.as_ref()),
            TestCaseParam::Context => self.context.as_ref().is_some_and(|c| !c.is_empty()),
            TestCaseParam::RetrievalContext => self
                .retrieval_context
                .as_ref()
                .is_some_and(|c| !c.is_empty()),
        }
    }

    /// Params from `required` this test case does not carry.
    pub fn missing_params(&self, required: &[TestCaseParam]) -> Vec<TestCaseParam> {
        required
            .iter()
            .copied()
            .filter(|p| !self.has_param(*p))
            .collect()
    }

    /// Serialize the declared fields, one `Label:\nvalue` block per param.
    pub fn render_fields(&self, params: &[TestCaseParam]) -> String {
        let mut text = String::new();
        for param in params {
            let value = self.render_param(*param).unwrap_or_default();
            text.push_str(&format!("{}:\n{} \n\n", param.label(), value));
        }
        text
    }
}

fn render_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| items.join("\n"))
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: String,
    pub content: String,
}

impl Turn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }
}

/// An ordered conversation to be judged turn by turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationalTestCase {
    pub turns: Vec<Turn>,
    pub name: Option<String>,
}

impl ConversationalTestCase {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns, name: None }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}
