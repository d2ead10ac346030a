use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Essential,
}

impl Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let plan = match self {
            Plan::Essential => "essential",
        };
        write!(f, "{}", plan)
    }
}

impl Plan {
    pub fn from_str(value: &str) -> Option<Self> {
        match value {
            "essential" => Some(Plan::Essential),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_tag_matches_display() {
        assert_eq!(Plan::Essential.to_string(), "essential");
        assert_eq!(Plan::from_str("essential"), Some(Plan::Essential));
        assert_eq!(Plan::from_str("premium"), None);
    }
}
