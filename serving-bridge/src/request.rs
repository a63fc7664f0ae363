use crate::error::BridgeError;
use crate::params::PredictionParams;
use crate::proto::{ModelSpec, PredictRequest};
use crate::tensor::NumericBuffer;

/// Model name sent with every request unless the operator overrides it at startup.
pub const DEFAULT_MODEL_NAME: &str = "default";

/// Build the `PredictRequest` for one call.
///
/// The only populated input is `params.input_name`. The model name always
/// comes from configuration, never from the caller.
pub fn build_predict_request(
    params: &PredictionParams,
    model_name: &str,
) -> Result<PredictRequest, BridgeError> {
    let buffer = NumericBuffer::parse(params.input_type, &params.input)?;

    let mut request = PredictRequest {
        model_spec: Some(ModelSpec {
            name: model_name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    };
    request
        .inputs
        .insert(params.input_name.clone(), buffer.into_tensor_proto());

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtype::ElementType;
    use crate::proto::DataType;

    fn params(name: &str, ty: ElementType, input: &[&str]) -> PredictionParams {
        PredictionParams {
            input_name: name.to_string(),
            input_type: ty,
            input: input.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_input_keyed_by_name() {
        let request =
            build_predict_request(&params("x", ElementType::Float32, &["1.0", "2.0", "3.0"]), DEFAULT_MODEL_NAME)
                .unwrap();

        assert_eq!(request.model_spec.as_ref().unwrap().name, "default");
        assert_eq!(request.inputs.len(), 1);
        let tensor = &request.inputs["x"];
        assert_eq!(tensor.dtype(), DataType::DtFloat);
        let shape = tensor.tensor_shape.as_ref().unwrap();
        assert_eq!(shape.dim.iter().map(|d| d.size).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn element_count_matches_input_length() {
        for n in [0usize, 1, 5, 64] {
            let values: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            let p = PredictionParams {
                input_name: "in".into(),
                input_type: ElementType::Int32,
                input: values,
            };
            let request = build_predict_request(&p, DEFAULT_MODEL_NAME).unwrap();
            let tensor = &request.inputs["in"];
            assert_eq!(tensor.tensor_shape.as_ref().unwrap().num_elements(), n as i64);
            assert_eq!(tensor.tensor_content.len(), n * 4);
        }
    }

    #[test]
    fn configured_model_name_is_used() {
        let request =
            build_predict_request(&params("x", ElementType::Int8, &["1"]), "mnist").unwrap();
        assert_eq!(request.model_spec.unwrap().name, "mnist");
    }

    #[test]
    fn unparseable_value_fails() {
        let err = build_predict_request(&params("x", ElementType::Float32, &["1.0", "oops"]), DEFAULT_MODEL_NAME)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_VALUE");
    }
}
