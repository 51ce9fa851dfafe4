//! Data exchanged with the debugger server.
//!
//! Field names follow the server's JSON encoding, so most fields carry an explicit rename.

use itertools::Itertools;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: u64,
}

/// A point in the debugee source code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub pc: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<Function>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Thread {
    pub id: i64,
    #[serde(default)]
    pub pc: u64,
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub line: usize,
    #[serde(default)]
    pub function: Option<Function>,
    #[serde(default, rename = "goroutineID")]
    pub goroutine_id: i64,
}

impl Thread {
    pub fn location(&self) -> Location {
        Location {
            pc: self.pc,
            file: self.file.clone(),
            line: self.line,
            function: self.function.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Goroutine {
    pub id: i64,
    #[serde(default, rename = "currentLoc")]
    pub current_loc: Location,
    #[serde(default, rename = "userCurrentLoc")]
    pub user_current_loc: Location,
    #[serde(default, rename = "threadID")]
    pub thread_id: i64,
}

/// Authoritative debugee state as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DebuggerState {
    #[serde(default, rename = "Running")]
    pub running: bool,
    #[serde(default, rename = "currentThread")]
    pub current_thread: Option<Thread>,
    #[serde(default, rename = "currentGoroutine")]
    pub selected_goroutine: Option<Goroutine>,
    #[serde(default, rename = "Threads", deserialize_with = "null_as_default")]
    pub threads: Vec<Thread>,
    #[serde(default, rename = "NextInProgress")]
    pub next_in_progress: bool,
    #[serde(default, rename = "exited")]
    pub exited: bool,
    #[serde(default, rename = "exitStatus")]
    pub exit_status: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Stackframe {
    #[serde(flatten)]
    pub location: Location,
    #[serde(default, rename = "FrameOffset")]
    pub frame_offset: i64,
    #[serde(default, rename = "Err")]
    pub err: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Breakpoint {
    pub id: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub addr: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub file: String,
    pub line: usize,
    #[serde(rename = "functionName", skip_serializing_if = "String::is_empty")]
    pub function_name: String,
    #[serde(rename = "Cond", skip_serializing_if = "String::is_empty")]
    pub cond: String,
    #[serde(rename = "totalHitCount", skip_serializing)]
    pub total_hit_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AsmInstruction {
    #[serde(default, rename = "Loc")]
    pub loc: Location,
    #[serde(default, rename = "DestLoc")]
    pub dest_loc: Option<Location>,
    #[serde(default, rename = "Text")]
    pub text: String,
    #[serde(default, rename = "Breakpoint")]
    pub breakpoint: bool,
    #[serde(default, rename = "AtPC")]
    pub at_pc: bool,
}

/// Goroutine and frame in which expressions are evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct EvalScope {
    #[serde(rename = "GoroutineID")]
    pub goroutine_id: i64,
    #[serde(rename = "Frame")]
    pub frame: usize,
    #[serde(rename = "DeferredCall")]
    pub deferred_call: usize,
}

impl EvalScope {
    pub fn new(goroutine_id: i64, frame: usize) -> Self {
        Self {
            goroutine_id,
            frame,
            deferred_call: 0,
        }
    }
}

/// Disassembly syntax. Encoded as the server's numeric constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString, Display)]
pub enum AsmFlavour {
    #[default]
    #[strum(serialize = "intel")]
    Intel = 0,
    #[strum(serialize = "gnu")]
    Gnu = 1,
    #[strum(serialize = "go")]
    Go = 2,
}

impl Serialize for AsmFlavour {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Variable {
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub unreadable: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<Variable>,
}

impl Variable {
    /// Render the value on a single line, composite values are rendered as `Type {a, b}`.
    pub fn single_line(&self) -> String {
        if !self.unreadable.is_empty() {
            return format!("(unreadable {})", self.unreadable);
        }
        if self.children.is_empty() || !self.value.is_empty() {
            return self.value.clone();
        }
        let children = self
            .children
            .iter()
            .map(|child| match child.name.as_str() {
                "" => child.single_line(),
                name => format!("{name}: {}", child.single_line()),
            })
            .join(", ");
        format!("{} {{{children}}}", self.r#type)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Register {
    #[serde(default, rename = "Name")]
    pub name: String,
    #[serde(default, rename = "Value")]
    pub value: String,
}

/// Limits applied by the server when loading variables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoadConfig {
    pub follow_pointers: bool,
    pub max_variable_recurse: i32,
    pub max_string_len: i32,
    pub max_array_values: i32,
    pub max_struct_fields: i32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            follow_pointers: true,
            max_variable_recurse: 1,
            max_string_len: 64,
            max_array_values: 64,
            max_struct_fields: -1,
        }
    }
}

/// Go encodes empty slices as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
