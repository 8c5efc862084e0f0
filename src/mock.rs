use rand::Rng;

/// Supported mock patterns for committed field values
#[derive(Debug, Clone, PartialEq)]
pub enum MockPattern {
    Name,
    Email,
    Uuid,
    /// Monotonic sequence with a prefix, e.g. `seq(ACC-)` -> ACC-1, ACC-2
    Seq(String),
    /// Fixed literal
    Const(String),
}

impl MockPattern {
    pub fn parse(pattern: &str) -> Option<MockPattern> {
        match pattern {
            "name" => Some(MockPattern::Name),
            "email" => Some(MockPattern::Email),
            "uuid" => Some(MockPattern::Uuid),
            _ => {
                if let Some(arg) = pattern.strip_prefix("seq(").and_then(|s| s.strip_suffix(')')) {
                    Some(MockPattern::Seq(arg.to_string()))
                } else {
                    pattern
                        .strip_prefix("const(")
                        .and_then(|s| s.strip_suffix(')'))
                        .map(|arg| MockPattern::Const(arg.to_string()))
                }
            }
        }
    }
}

const FIRST_NAMES: &[&str] = &[
    "Alex", "Sam", "Jordan", "Casey", "Riley", "Morgan", "Taylor", "Avery",
];
const LAST_NAMES: &[&str] = &[
    "Reed", "Hart", "Cole", "Lane", "Wells", "Banks", "Frost", "Pierce",
];

/// Mock value generation with explicit run-scoped state: the sequence
/// counter lives here, never in process-wide globals.
#[derive(Debug, Default)]
pub struct MockGenerator {
    sequence: u64,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, pattern: &MockPattern) -> String {
        match pattern {
            MockPattern::Name => {
                let mut rng = rand::thread_rng();
                format!(
                    "{} {}",
                    FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())],
                    LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())]
                )
            }
            MockPattern::Email => {
                let mut rng = rand::thread_rng();
                format!(
                    "{}.{}{}@example.com",
                    FIRST_NAMES[rng.gen_range(0..FIRST_NAMES.len())].to_lowercase(),
                    LAST_NAMES[rng.gen_range(0..LAST_NAMES.len())].to_lowercase(),
                    rng.gen_range(1..10000)
                )
            }
            MockPattern::Uuid => uuid::Uuid::new_v4().to_string(),
            MockPattern::Seq(prefix) => {
                self.sequence += 1;
                format!("{}{}", prefix, self.sequence)
            }
            MockPattern::Const(value) => value.clone(),
        }
    }
}
