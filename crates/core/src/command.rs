//! The UI Instruction Set
//!
//! Every command the renderer understands is a variant of [`UiCommand`]. On the
//! wire a command is a JSON object discriminated by its `command` field, e.g.
//! `{"command": "ADD_TEXT", "text": "Hello", "container_id": "main_workspace"}`.
//!
//! Each variant payload implements [`CommandVariant`], which is what the
//! registry needs to decode and validate it and to describe it to a model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Container used by commands that omit `container_id`.
pub const DEFAULT_CONTAINER_ID: &str = "main_workspace";

fn default_container_id() -> String {
    DEFAULT_CONTAINER_ID.to_string()
}

/// Static description of one variant of the instruction set.
pub trait CommandVariant: DeserializeOwned + JsonSchema + Into<UiCommand> {
    /// The wire tag, e.g. `ADD_SLIDER`.
    const TAG: &'static str;
    /// Declaration-style name models tend to use, e.g. `AddSliderCommand`.
    const ALIAS: &'static str;
    /// One-line description handed to the model alongside the schema.
    const DESCRIPTION: &'static str;
    /// Whether an absent `container_id` is filled with the configured default.
    const HAS_DEFAULT_CONTAINER: bool = true;

    /// Checks constraints that the type system cannot express.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// One typed, validated instruction to mutate the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UiCommand {
    AddText(AddText),
    AddButton(AddButton),
    AddSlider(AddSlider),
    AddDropdown(AddDropdown),
    AddTextInput(AddTextInput),
    AddDatePicker(AddDatePicker),
    ClearContainer(ClearContainer),
}

impl UiCommand {
    pub fn tag(&self) -> &'static str {
        match self {
            UiCommand::AddText(_) => AddText::TAG,
            UiCommand::AddButton(_) => AddButton::TAG,
            UiCommand::AddSlider(_) => AddSlider::TAG,
            UiCommand::AddDropdown(_) => AddDropdown::TAG,
            UiCommand::AddTextInput(_) => AddTextInput::TAG,
            UiCommand::AddDatePicker(_) => AddDatePicker::TAG,
            UiCommand::ClearContainer(_) => ClearContainer::TAG,
        }
    }

    /// The container this command targets.
    pub fn container_id(&self) -> &str {
        match self {
            UiCommand::AddText(c) => &c.container_id,
            UiCommand::AddButton(c) => &c.container_id,
            UiCommand::AddSlider(c) => &c.container_id,
            UiCommand::AddDropdown(c) => &c.container_id,
            UiCommand::AddTextInput(c) => &c.container_id,
            UiCommand::AddDatePicker(c) => &c.container_id,
            UiCommand::ClearContainer(c) => &c.container_id,
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("`{}` must not be empty", field))
    } else {
        Ok(())
    }
}

// --- ADD_TEXT ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TextStyle {
    Header,
    #[default]
    Body,
    Code,
}

/// Adds a block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddText {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
}

impl CommandVariant for AddText {
    const TAG: &'static str = "ADD_TEXT";
    const ALIAS: &'static str = "AddTextCommand";
    const DESCRIPTION: &'static str =
        "Adds a block of text (style: header, body or code) to a container.";

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)
    }
}

// --- ADD_BUTTON ---

/// Adds a clickable button. Clicks come back as `button_click` events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddButton {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    pub button_id: String,
    pub text: String,
}

impl CommandVariant for AddButton {
    const TAG: &'static str = "ADD_BUTTON";
    const ALIAS: &'static str = "AddButtonCommand";
    const DESCRIPTION: &'static str =
        "Adds a button; clicking it reports a button_click event with the button_id.";

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)?;
        require_non_empty("button_id", &self.button_id)
    }
}

// --- ADD_SLIDER ---

/// Adds a numeric slider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddSlider {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    pub slider_id: String,
    pub label: String,
    pub min_val: f64,
    pub max_val: f64,
    pub default_val: f64,
}

impl CommandVariant for AddSlider {
    const TAG: &'static str = "ADD_SLIDER";
    const ALIAS: &'static str = "AddSliderCommand";
    const DESCRIPTION: &'static str = "Adds a numeric slider; min_val <= default_val <= max_val.";

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)?;
        require_non_empty("slider_id", &self.slider_id)?;
        if self.min_val > self.max_val {
            return Err(format!(
                "min_val ({}) is greater than max_val ({})",
                self.min_val, self.max_val
            ));
        }
        if self.default_val < self.min_val || self.default_val > self.max_val {
            return Err(format!(
                "default_val ({}) is outside [{}, {}]",
                self.default_val, self.min_val, self.max_val
            ));
        }
        Ok(())
    }
}

// --- ADD_DROPDOWN ---

/// A selectable dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(from = "RawDropdownOption")]
pub struct DropdownOption {
    pub value: String,
    pub label: String,
}

/// Options arrive either as bare strings or as `{value, label}` objects.
#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum RawDropdownOption {
    Plain(String),
    Labeled { value: String, label: Option<String> },
}

impl From<RawDropdownOption> for DropdownOption {
    fn from(raw: RawDropdownOption) -> Self {
        match raw {
            RawDropdownOption::Plain(value) => Self {
                label: value.clone(),
                value,
            },
            RawDropdownOption::Labeled { value, label } => Self {
                label: label.unwrap_or_else(|| value.clone()),
                value,
            },
        }
    }
}

/// Adds a dropdown. Unlike the other `ADD_*` commands the container is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddDropdown {
    pub container_id: String,
    pub options: Vec<DropdownOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropdown_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl CommandVariant for AddDropdown {
    const TAG: &'static str = "ADD_DROPDOWN";
    const ALIAS: &'static str = "AddDropdownCommand";
    const DESCRIPTION: &'static str =
        "Adds a dropdown element to the UI in the specified container.";
    const HAS_DEFAULT_CONTAINER: bool = false;

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)?;
        if self.options.is_empty() {
            return Err("`options` must contain at least one entry".to_string());
        }
        Ok(())
    }
}

// --- ADD_TEXT_INPUT ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Text,
    Email,
    Password,
    Number,
    Tel,
    Url,
}

/// Adds a single-line text field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddTextInput {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    pub input_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default)]
    pub input_type: InputType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u32>,
}

impl CommandVariant for AddTextInput {
    const TAG: &'static str = "ADD_TEXT_INPUT";
    const ALIAS: &'static str = "AddTextInputCommand";
    const DESCRIPTION: &'static str =
        "Adds a text input field; edits report a text_input_change event with the input_id.";

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)?;
        require_non_empty("input_id", &self.input_id)?;
        if let Some(max) = self.max_length {
            if max == 0 {
                return Err("`max_length` must be at least 1".to_string());
            }
            if let Some(default) = &self.default_value {
                if default.chars().count() > max as usize {
                    return Err(format!("default_value is longer than max_length ({})", max));
                }
            }
        }
        Ok(())
    }
}

// --- ADD_DATE_PICKER ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum DateFormat {
    #[default]
    #[serde(rename = "YYYY-MM-DD")]
    Iso,
    #[serde(rename = "MM/DD/YYYY")]
    MonthFirst,
    #[serde(rename = "DD/MM/YYYY")]
    DayFirst,
}

/// Adds a calendar date picker. Date bounds are ISO `YYYY-MM-DD` strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AddDatePicker {
    #[serde(default = "default_container_id")]
    pub container_id: String,
    pub date_picker_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,
    #[serde(default)]
    pub date_format: DateFormat,
}

/// `YYYY-MM-DD`, which also orders correctly as a plain string.
fn is_iso_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

impl CommandVariant for AddDatePicker {
    const TAG: &'static str = "ADD_DATE_PICKER";
    const ALIAS: &'static str = "AddDatePickerCommand";
    const DESCRIPTION: &'static str =
        "Adds a date picker; dates are ISO YYYY-MM-DD and min_date <= max_date.";

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)?;
        require_non_empty("date_picker_id", &self.date_picker_id)?;
        for (field, value) in [
            ("default_date", &self.default_date),
            ("min_date", &self.min_date),
            ("max_date", &self.max_date),
        ] {
            if let Some(date) = value {
                if !is_iso_date(date) {
                    return Err(format!("`{}` must be YYYY-MM-DD, got '{}'", field, date));
                }
            }
        }
        if let (Some(min), Some(max)) = (&self.min_date, &self.max_date) {
            if min > max {
                return Err(format!("min_date ({}) is after max_date ({})", min, max));
            }
        }
        if let Some(default) = &self.default_date {
            let below = self.min_date.as_ref().is_some_and(|min| default < min);
            let above = self.max_date.as_ref().is_some_and(|max| default > max);
            if below || above {
                return Err(format!("default_date ({}) is outside the allowed range", default));
            }
        }
        Ok(())
    }
}

// --- CLEAR_CONTAINER ---

/// Removes every element from a container. The container must be named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ClearContainer {
    pub container_id: String,
}

impl CommandVariant for ClearContainer {
    const TAG: &'static str = "CLEAR_CONTAINER";
    const ALIAS: &'static str = "ClearContainerCommand";
    const DESCRIPTION: &'static str = "Removes every element from the given container.";
    const HAS_DEFAULT_CONTAINER: bool = false;

    fn validate(&self) -> Result<(), String> {
        require_non_empty("container_id", &self.container_id)
    }
}

macro_rules! impl_into_command {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for UiCommand {
                fn from(command: $variant) -> Self {
                    UiCommand::$variant(command)
                }
            }
        )*
    };
}

impl_into_command!(
    AddText,
    AddButton,
    AddSlider,
    AddDropdown,
    AddTextInput,
    AddDatePicker,
    ClearContainer,
);

/// An ordered bundle of chat text and UI commands sent to the renderer.
///
/// The order of `ui_commands` is significant: later commands may target
/// containers or ids created earlier in the same packet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponsePacket {
    pub chat_message: Option<String>,
    #[serde(default)]
    pub ui_commands: Vec<UiCommand>,
}

impl ResponsePacket {
    /// A packet carrying only chat text.
    pub fn chat(message: impl Into<String>) -> Self {
        Self {
            chat_message: Some(message.into()),
            ui_commands: Vec::new(),
        }
    }
}
