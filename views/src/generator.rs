use log::debug;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::{Document, Field, FieldPath, Pattern, Row, View};

/// A filter on one document field.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `===` against a JSON literal.
    Equals(Value),
    Satisfies(Pattern),
    /// The field contains any of the words, ignoring case.
    Contains(Vec<String>),
    Exists,
}

#[derive(Debug, Clone)]
enum Test {
    Equals(Value),
    Matches(Pattern),
    Exists,
}

// JavaScript `===` against a literal: numbers by value, arrays and objects never
// equal, `undefined` equals nothing.
fn strict_eq(field: Field<'_>, literal: &Value) -> bool {
    match (field, literal) {
        (Field::Absent, _) => false,
        (Field::Null, l) => l.is_null(),
        (Field::Present(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Field::Present(Value::Array(_)), _) | (Field::Present(Value::Object(_)), _) => false,
        (Field::Present(a), b) => a == b,
    }
}

#[derive(Debug, Clone)]
pub enum Projection {
    Path(FieldPath),
    List(Vec<FieldPath>),
    Named(Vec<(String, FieldPath)>),
    /// The whole document.
    Document,
}

impl Projection {
    pub fn path(path: &str) -> Result<Self> {
        Ok(Projection::Path(path.parse()?))
    }

    pub fn list(paths: &[&str]) -> Result<Self> {
        let paths = paths
            .iter()
            .map(|p| p.parse::<FieldPath>())
            .collect::<Result<Vec<FieldPath>>>()?;
        Ok(Projection::List(paths))
    }

    pub fn named(fields: &[(&str, &str)]) -> Result<Self> {
        let fields = fields
            .iter()
            .map(|(name, p)| Ok(((*name).to_owned(), p.parse::<FieldPath>()?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Projection::Named(fields))
    }

    fn eval(&self, doc: &Document) -> Value {
        match self {
            Projection::Path(p) => doc.field(p).to_value(),
            Projection::List(ps) => Value::Array(ps.iter().map(|p| doc.field(p).to_value()).collect()),
            Projection::Named(fs) => {
                let mut map = Map::new();
                for (name, p) in fs.iter() {
                    map.insert(name.clone(), doc.field(p).to_value());
                }
                Value::Object(map)
            }
            Projection::Document => doc.as_value().clone(),
        }
    }

    fn to_js(&self) -> String {
        match self {
            Projection::Path(p) => p.to_js(),
            Projection::List(ps) => {
                let items: Vec<String> = ps.iter().map(FieldPath::to_js).collect();
                format!("[{}]", items.join(", "))
            }
            Projection::Named(fs) => {
                let items: Vec<String> = fs
                    .iter()
                    .map(|(name, p)| format!("{}: {}", Value::from(name.as_str()), p.to_js()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Projection::Document => "doc".to_owned(),
        }
    }
}

/// Builds a view out of AND-ed conditions and key/value projections.
///
/// ```
/// use election_views::{Condition, MapGenerator, Projection};
///
/// let mut mg = MapGenerator::new();
/// mg.add_condition("tweet.text", Condition::Contains(vec!["election".into()])).unwrap();
/// mg.add_condition("sa2", Condition::Exists).unwrap();
/// mg.set_key(Projection::path("sa2").unwrap());
/// mg.set_value(Projection::path("sentiment.compound").unwrap());
/// assert_eq!(
///     mg.generate(),
///     "function (doc) { if (/(election)/i.test(doc.tweet.text) && doc.sa2) { emit(doc.sa2, doc.sentiment.compound) } }"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct MapGenerator {
    conditions: Vec<(FieldPath, Test)>,
    key: Projection,
    value: Projection,
}

impl MapGenerator {
    /// Emits `_id -> doc` for every document until configured otherwise.
    pub fn new() -> Self {
        Self {
            conditions: Vec::new(),
            key: Projection::Path(FieldPath::keys(vec!["_id"])),
            value: Projection::Document,
        }
    }

    pub fn add_condition(&mut self, field: &str, condition: Condition) -> Result<&mut Self> {
        let field: FieldPath = field.parse()?;
        let test = match condition {
            Condition::Equals(v) => Test::Equals(v),
            Condition::Satisfies(p) => Test::Matches(p),
            Condition::Contains(words) if words.is_empty() => {
                debug!("no words to match on {}, condition ignored", field);
                return Ok(self);
            }
            Condition::Contains(words) => Test::Matches(Pattern::any_of(&words)?),
            Condition::Exists => Test::Exists,
        };
        self.conditions.push((field, test));
        Ok(self)
    }

    pub fn set_key(&mut self, key: Projection) -> &mut Self {
        self.key = key;
        self
    }

    pub fn set_value(&mut self, value: Projection) -> &mut Self {
        self.value = value;
        self
    }

    fn accepts(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, test)| {
            let f = doc.field(field);
            match test {
                Test::Equals(v) => strict_eq(f, v),
                Test::Matches(p) => f.text().map_or(false, |t| p.is_match(&t)),
                Test::Exists => f.truthy().is_some(),
            }
        })
    }

    pub fn generate(&self) -> String {
        let emit = format!("emit({}, {})", self.key.to_js(), self.value.to_js());
        if self.conditions.is_empty() {
            return format!("function (doc) {{ {} }}", emit);
        }
        let conditions: Vec<String> = self
            .conditions
            .iter()
            .map(|(field, test)| match test {
                Test::Equals(v) => format!("{} === {}", field.to_js(), v),
                Test::Matches(p) => format!("{}.test({})", p.to_js(), field.to_js()),
                Test::Exists => field.to_js(),
            })
            .collect();
        format!(
            "function (doc) {{ if ({}) {{ {} }} }}",
            conditions.join(" && "),
            emit
        )
    }
}

impl Default for MapGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl View for MapGenerator {
    fn map(&self, doc: &Document) -> Vec<Row> {
        if !self.accepts(doc) {
            return Vec::new();
        }
        vec![Row::new(doc, self.key.eval(doc), self.value.eval(doc))]
    }

    fn source(&self) -> String {
        self.generate()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    fn tweet() -> Document {
        Document::new(json!({
            "_id": "1",
            "tweet": {
                "id_str": "1520000000000000000",
                "text": "Prime Minister on the #auspol campaign trail",
                "coordinates": {"type": "Point", "coordinates": [144.96, -37.81]},
            },
            "sa2": "206041117",
            "sentiment": {"compound": -0.25},
        }))
    }

    #[test]
    fn test_default_emits_whole_document() {
        let mg = MapGenerator::new();
        assert_eq!(mg.generate(), "function (doc) { emit(doc._id, doc) }");
        let doc = tweet();
        let rows = mg.map(&doc);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, json!("1"));
        assert_eq!(&rows[0].value, doc.as_value());
    }

    #[test]
    fn test_tweets_with_sa2() {
        let mut mg = MapGenerator::new();
        mg.add_condition(
            "tweet.text",
            Condition::Contains(vec!["scott morrison".into(), "prime minister".into()]),
        )
        .unwrap()
        .add_condition("sa2", Condition::Exists)
        .unwrap();
        mg.set_key(Projection::path("tweet.id_str").unwrap());
        mg.set_value(
            Projection::named(&[
                ("sa2", "sa2"),
                ("compound", "sentiment.compound"),
                ("longitude", "tweet.coordinates.coordinates[0]"),
                ("latitude", "tweet.coordinates.coordinates[1]"),
            ])
            .unwrap(),
        );

        let rows = mg.map(&tweet());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, json!("1520000000000000000"));
        assert_eq!(
            rows[0].value,
            json!({"sa2": "206041117", "compound": -0.25, "longitude": 144.96, "latitude": -37.81})
        );

        let src = mg.generate();
        assert!(src.contains("/(scott morrison|prime minister)/i.test(doc.tweet.text) && doc.sa2"));
        assert!(src.contains(r#"{"sa2": doc.sa2, "compound": doc.sentiment.compound, "longitude": doc.tweet.coordinates.coordinates[0], "latitude": doc.tweet.coordinates.coordinates[1]}"#));

        let other = Document::new(json!({"tweet": {"text": "prime minister"}}));
        assert!(mg.map(&other).is_empty());
    }

    #[test]
    fn test_equals() {
        let mut mg = MapGenerator::new();
        mg.add_condition("GCC_NAME16", Condition::Equals(json!("Greater Melbourne")))
            .unwrap();
        mg.set_key(Projection::named(&[("SA2_MAIN16", "SA2_MAIN16")]).unwrap());
        mg.set_value(Projection::list(&["SA2_NAME16", "missing"]).unwrap());
        assert_eq!(
            mg.generate(),
            r#"function (doc) { if (doc.GCC_NAME16 === "Greater Melbourne") { emit({"SA2_MAIN16": doc.SA2_MAIN16}, [doc.SA2_NAME16, doc.missing]) } }"#
        );

        let mel = Document::new(json!({
            "GCC_NAME16": "Greater Melbourne",
            "SA2_MAIN16": "206041117",
            "SA2_NAME16": "Carlton",
        }));
        let rows = mg.map(&mel);
        assert_eq!(rows[0].key, json!({"SA2_MAIN16": "206041117"}));
        assert_eq!(rows[0].value, json!(["Carlton", null]));

        let syd = Document::new(json!({"GCC_NAME16": "Greater Sydney"}));
        assert!(mg.map(&syd).is_empty());
    }

    #[test]
    fn test_equals_null_and_numbers() {
        let mut mg = MapGenerator::new();
        mg.add_condition("place", Condition::Equals(Value::Null)).unwrap();
        assert_eq!(mg.generate(), "function (doc) { if (doc.place === null) { emit(doc._id, doc) } }");
        assert_eq!(mg.map(&Document::new(json!({"place": null}))).len(), 1);
        assert!(mg.map(&Document::new(json!({}))).is_empty());
        assert!(mg.map(&Document::new(json!({"place": "Carlton"}))).is_empty());

        let mut mg = MapGenerator::new();
        mg.add_condition("n", Condition::Equals(json!(1))).unwrap();
        assert_eq!(mg.map(&Document::new(json!({"n": 1.0}))).len(), 1);
        assert_eq!(mg.map(&Document::new(json!({"n": 1}))).len(), 1);
        assert!(mg.map(&Document::new(json!({"n": "1"}))).is_empty());

        let mut mg = MapGenerator::new();
        mg.add_condition("tags", Condition::Equals(json!(["auspol"]))).unwrap();
        assert!(mg.map(&Document::new(json!({"tags": ["auspol"]}))).is_empty());
    }

    #[test]
    fn test_satisfies_and_empty_contains() {
        let mut mg = MapGenerator::new();
        mg.add_condition("tweet.text", Condition::Satisfies(Pattern::parse_js("/campaign/i").unwrap()))
            .unwrap()
            .add_condition("tweet.text", Condition::Contains(Vec::new()))
            .unwrap();
        assert_eq!(
            mg.generate(),
            "function (doc) { if (/campaign/i.test(doc.tweet.text)) { emit(doc._id, doc) } }"
        );
        assert_eq!(mg.map(&tweet()).len(), 1);
    }

    #[test]
    fn test_bad_path() {
        let mut mg = MapGenerator::new();
        assert!(mg.add_condition("tweet..text", Condition::Exists).is_err());
        assert!(Projection::path("").is_err());
    }
}
