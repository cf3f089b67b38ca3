//! Calldata encoding and return-data decoding using alloy-dyn-abi

use alloy_dyn_abi::{DynSolType, DynSolValue};
use alloy_primitives::Bytes;

use crate::domain::abi::FunctionDescriptor;
use crate::domain::error::EncodingError;

/// Encode `selector || abi.encode(args)` for a function call
pub fn encode_call(
    function: &FunctionDescriptor,
    args: Vec<DynSolValue>,
) -> Result<Bytes, EncodingError> {
    if args.len() != function.inputs.len() {
        return Err(EncodingError::ArgumentCount {
            function: function.name.clone(),
            expected: function.inputs.len(),
            got: args.len(),
        });
    }

    for (index, (param, arg)) in function.inputs.iter().zip(&args).enumerate() {
        if !param.ty.matches(arg) {
            return Err(EncodingError::ArgumentType {
                function: function.name.clone(),
                index,
                kind: param.kind.clone(),
            });
        }
    }

    let mut calldata = function.selector.to_vec();
    if !args.is_empty() {
        calldata.extend_from_slice(&DynSolValue::Tuple(args).abi_encode_params());
    }
    Ok(calldata.into())
}

/// Decode the return data of a call into its output values
pub fn decode_output(function: &FunctionDescriptor, data: &[u8]) -> Result<Vec<DynSolValue>, String> {
    if function.outputs.is_empty() {
        return Ok(Vec::new());
    }

    let tuple_type = DynSolType::Tuple(function.outputs.iter().map(|p| p.ty.clone()).collect());
    match tuple_type.abi_decode_params(data) {
        Ok(DynSolValue::Tuple(values)) => Ok(values),
        Ok(other) => Ok(vec![other]),
        Err(err) => Err(err.to_string()),
    }
}
