use crate::dtype::ElementType;
use crate::error::BridgeError;

pub const INPUT_NAME: &str = "input_name";
pub const INPUT_TYPE: &str = "input_type";
pub const INPUT: &str = "input";

// ── Raw request values ────────────────────────────────────────────────────

/// Ordered multi-map of every parameter the caller sent.
///
/// Query-string pairs are pushed before form-body pairs, so a single-valued
/// lookup prefers the query string and a multi-valued lookup yields query
/// values first.
#[derive(Debug, Clone, Default)]
pub struct RequestValues {
    pairs: Vec<(String, String)>,
}

impl RequestValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_urlencoded(input: &[u8]) -> Self {
        let mut values = Self::new();
        values.extend_urlencoded(input);
        values
    }

    /// Append pairs decoded from an `application/x-www-form-urlencoded` payload.
    pub fn extend_urlencoded(&mut self, input: &[u8]) {
        self.pairs.extend(
            form_urlencoded::parse(input).map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value for `key`, in arrival order.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ── Validated parameters ─────────────────────────────────────────────────

/// Parameters of one `/model_prediction` call, validated at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionParams {
    pub input_name: String,
    pub input_type: ElementType,
    pub input: Vec<String>,
}

impl PredictionParams {
    pub fn from_values(values: &RequestValues) -> Result<Self, BridgeError> {
        let input_name = values
            .get(INPUT_NAME)
            .ok_or(BridgeError::MissingParam(INPUT_NAME))?;
        if input_name.is_empty() {
            return Err(BridgeError::InvalidParams(format!("{INPUT_NAME} must not be empty")));
        }

        let input_type = values
            .get(INPUT_TYPE)
            .ok_or(BridgeError::MissingParam(INPUT_TYPE))?
            .parse::<ElementType>()?;

        Ok(Self {
            input_name: input_name.to_string(),
            input_type,
            input: values.get_all(INPUT),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_query_string() {
        let values = RequestValues::from_urlencoded(
            b"input_name=x&input_type=float32&input=1.0&input=2.0&input=3.0",
        );
        let params = PredictionParams::from_values(&values).unwrap();
        assert_eq!(params.input_name, "x");
        assert_eq!(params.input_type, ElementType::Float32);
        assert_eq!(params.input, vec!["1.0", "2.0", "3.0"]);
    }

    #[test]
    fn percent_and_plus_decoding() {
        let values = RequestValues::from_urlencoded(b"input_name=images%2F0&input=a+b");
        assert_eq!(values.get("input_name"), Some("images/0"));
        assert_eq!(values.get_all("input"), vec!["a b"]);
    }

    #[test]
    fn first_value_wins_and_lists_concatenate() {
        let mut values = RequestValues::from_urlencoded(b"input_name=q&input=1");
        values.extend_urlencoded(b"input_name=f&input=2&input=3");
        assert_eq!(values.get("input_name"), Some("q"));
        assert_eq!(values.get_all("input"), vec!["1", "2", "3"]);
        assert_eq!(values.len(), 5);
    }

    #[test]
    fn missing_input_omits_values() {
        let values: RequestValues = [("input_name", "x"), ("input_type", "int64")]
            .into_iter()
            .collect();
        let params = PredictionParams::from_values(&values).unwrap();
        assert!(params.input.is_empty());
    }

    #[test]
    fn missing_input_name() {
        let values: RequestValues = [("input_type", "float32")].into_iter().collect();
        let err = PredictionParams::from_values(&values).unwrap_err();
        assert!(matches!(err, BridgeError::MissingParam("input_name")));
    }

    #[test]
    fn empty_input_name() {
        let values: RequestValues = [("input_name", ""), ("input_type", "float32")]
            .into_iter()
            .collect();
        let err = PredictionParams::from_values(&values).unwrap_err();
        assert_eq!(err.code(), "INVALID_PARAMS");
    }

    #[test]
    fn missing_input_type() {
        let values: RequestValues = [("input_name", "x"), ("input", "1")].into_iter().collect();
        let err = PredictionParams::from_values(&values).unwrap_err();
        assert!(matches!(err, BridgeError::MissingParam("input_type")));
    }

    #[test]
    fn unknown_input_type() {
        let values: RequestValues = [("input_name", "x"), ("input_type", "not_a_type")]
            .into_iter()
            .collect();
        let err = PredictionParams::from_values(&values).unwrap_err();
        assert_eq!(err.code(), "UNSUPPORTED_TYPE");
    }

    #[test]
    fn model_name_is_not_a_parameter() {
        let values: RequestValues = [
            ("input_name", "x"),
            ("input_type", "float32"),
            ("model_name", "other"),
        ]
        .into_iter()
        .collect();
        let params = PredictionParams::from_values(&values).unwrap();
        assert_eq!(params.input_name, "x");
    }
}
