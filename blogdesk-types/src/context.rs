//! Context in which an entry is shown (drives comments and tags).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLevel {
    System,
    User,
    Course,
    Module,
}

/// Resolved context level plus the instance it refers to (0 for system).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryContext {
    pub level: ContextLevel,
    pub instance_id: i64,
}

impl EntryContext {
    /// A user context applies only when no course or module is associated.
    /// The site home course counts as the system context.
    pub fn resolve(
        user_id: Option<i64>,
        course_id: Option<i64>,
        module_id: Option<i64>,
        site_home_id: Option<i64>,
    ) -> Self {
        match (user_id, course_id, module_id) {
            (Some(user), None, None) => Self {
                level: ContextLevel::User,
                instance_id: user,
            },
            (_, Some(course), _) if Some(course) != site_home_id => Self {
                level: ContextLevel::Course,
                instance_id: course,
            },
            _ => Self::system(),
        }
    }

    pub const fn system() -> Self {
        Self {
            level: ContextLevel::System,
            instance_id: 0,
        }
    }
}

impl Default for EntryContext {
    fn default() -> Self {
        Self::system()
    }
}
