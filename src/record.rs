use std::collections::BTreeMap;
use std::fmt;

/// One column of the final dataset. Variants are declared in export order,
/// so the derived `Ord` makes `Record` iteration match the CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Title,
    Author,
    OverallScore,
    Ratings,
    RetrievedAt,
    Followers,
    Pages,
    PublishedBooks,
    StorySetting,
    McGender,
    Steamy,
    McSexualOrientation,
    Subgenre,
    TotalViews,
    AverageViews,
    Favorites,
    Blurb,
    Tags,
    Warnings,
    ThumbnailUrl,
    Url,
}

impl Field {
    pub const ALL: [Field; 21] = [
        Field::Title,
        Field::Author,
        Field::OverallScore,
        Field::Ratings,
        Field::RetrievedAt,
        Field::Followers,
        Field::Pages,
        Field::PublishedBooks,
        Field::StorySetting,
        Field::McGender,
        Field::Steamy,
        Field::McSexualOrientation,
        Field::Subgenre,
        Field::TotalViews,
        Field::AverageViews,
        Field::Favorites,
        Field::Blurb,
        Field::Tags,
        Field::Warnings,
        Field::ThumbnailUrl,
        Field::Url,
    ];

    /// Column header as it appears in the exported dataset.
    pub fn name(self) -> &'static str {
        match self {
            Field::Title => "RR Title",
            Field::Author => "RR Author",
            Field::OverallScore => "RR Overall Score",
            Field::Ratings => "RR Ratings",
            Field::RetrievedAt => "RR Retrieved at",
            Field::Followers => "RR Followers",
            Field::Pages => "RR Pages",
            Field::PublishedBooks => "Number of Published Book(s)",
            Field::StorySetting => "Story Setting",
            Field::McGender => "MC Gender",
            Field::Steamy => "Steamy (18+/NSFW)",
            Field::McSexualOrientation => "MC Sexual Orientation",
            Field::Subgenre => "Subgenre",
            Field::TotalViews => "RR Total Views",
            Field::AverageViews => "RR Average Views",
            Field::Favorites => "RR Favorites",
            Field::Blurb => "RR Blurb",
            Field::Tags => "RR Tags",
            Field::Warnings => "RR Warnings",
            Field::ThumbnailUrl => "RR Thumbnail URL",
            Field::Url => "RR URL",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|f| f.name() == name)
    }
}

/// A single cell value: raw extraction and gap-filling produce `Text` or
/// `Absent`, normalization upgrades recognized shapes to `Int`/`Float`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Absent,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Map a JSON value from the completion service onto a cell value.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Absent,
            serde_json::Value::String(s) => Value::Text(s.clone()),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => n.as_f64().map(Value::Float).unwrap_or(Value::Absent),
            },
            other => Value::Text(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Absent => Ok(()),
        }
    }
}

static ABSENT: Value = Value::Absent;

/// One scraped page as a full set of field/value pairs. Every field of
/// [`Field::ALL`] is always present; unresolved fields hold `Value::Absent`
/// rather than being omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: BTreeMap<Field, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self {
            values: Field::ALL.iter().map(|f| (*f, Value::Absent)).collect(),
        }
    }

    pub fn get(&self, field: Field) -> &Value {
        self.values.get(&field).unwrap_or(&ABSENT)
    }

    pub fn set(&mut self, field: Field, value: Value) {
        self.values.insert(field, value);
    }

    /// Iterate all fields in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.values.iter()
    }

    /// Fields of `scope` whose value is currently absent. Recomputed fresh on
    /// every call; the gap-filler must never cache this across invocations.
    pub fn missing_in(&self, scope: &[Field]) -> Vec<Field> {
        scope
            .iter()
            .copied()
            .filter(|f| self.get(*f).is_absent())
            .collect()
    }

    /// Fields of `scope` that already carry a value.
    pub fn resolved_in(&self, scope: &[Field]) -> Vec<(Field, &Value)> {
        scope
            .iter()
            .copied()
            .filter_map(|f| {
                let v = self.get(f);
                (!v.is_absent()).then_some((f, v))
            })
            .collect()
    }
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──
