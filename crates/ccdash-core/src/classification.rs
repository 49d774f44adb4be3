//! Classification path parsing
//!
//! Events are tagged with a free-text hierarchy such as
//! `Root / Billing / Refund / Late`. The reporting topic is the second
//! component when there is one, otherwise the first; the subtopic is
//! everything from the third component onward.

use serde::{Deserialize, Serialize};

/// Separator between hierarchy levels
pub const PATH_DELIMITER: char = '/';

/// Topic and subtopic extracted from a classification path
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParsedPath {
    pub topic: String,
    pub subtopic: String,
}

/// Split a classification path into topic and subtopic
///
/// Components are not collapsed: `"A//B"` has three components, the
/// second of them empty. Whitespace is trimmed from the topic and from the
/// joined subtopic as a whole, not from each subtopic component.
///
/// | depth | topic          | subtopic                      |
/// |-------|----------------|-------------------------------|
/// | 1     | component 0    | `""`                          |
/// | 2     | component 1    | `""`                          |
/// | >= 3  | component 1    | components 2.. joined by `/`  |
///
/// # Examples
/// ```
/// use ccdash_core::classification::parse_path;
///
/// let parsed = parse_path("Calls / Billing / Refund / Late");
/// assert_eq!(parsed.topic, "Billing");
/// assert_eq!(parsed.subtopic, "Refund / Late");
///
/// assert_eq!(parse_path("Billing").topic, "Billing");
/// ```
pub fn parse_path(path: &str) -> ParsedPath {
    let components: Vec<&str> = path.split(PATH_DELIMITER).collect();

    match components.len() {
        0 | 1 => ParsedPath {
            topic: path.trim().to_string(),
            subtopic: String::new(),
        },
        2 => ParsedPath {
            topic: components[1].trim().to_string(),
            subtopic: String::new(),
        },
        _ => {
            let mut subtopic = String::new();
            for (i, component) in components[2..].iter().enumerate() {
                if i > 0 {
                    subtopic.push(PATH_DELIMITER);
                }
                subtopic.push_str(component);
            }
            ParsedPath {
                topic: components[1].trim().to_string(),
                subtopic: subtopic.trim().to_string(),
            }
        }
    }
}
