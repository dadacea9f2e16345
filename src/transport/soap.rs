//! SOAP 1.1 envelopes for the relying-party service.

use std::collections::BTreeSet;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use serde_json::Value;

use super::xml::{parse_document, XmlElement};
use crate::{
    errors::{Error, Result},
    service::{FaultStatus, Operation, Parameters},
};

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const TYPES_NS: &str = "http://bankid.com/RpService/v4.0.0/types/";
pub const CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Body element wrapping the parameters of an operation. `Collect` sends its
/// single `orderRef` directly in the body.
fn request_element(operation: Operation) -> Option<&'static str> {
    match operation {
        Operation::Authenticate => Some("AuthenticateRequest"),
        Operation::Sign => Some("SignRequest"),
        Operation::Collect => None,
    }
}

/// Serialize one request envelope.
pub fn encode_request(operation: Operation, params: &Parameters) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    emit(&mut writer, Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    emit(
        &mut writer,
        Event::Start(
            BytesStart::new("soapenv:Envelope")
                .with_attributes([("xmlns:soapenv", SOAP_ENV_NS), ("xmlns:typ", TYPES_NS)]),
        ),
    )?;
    emit(&mut writer, Event::Empty(BytesStart::new("soapenv:Header")))?;
    emit(&mut writer, Event::Start(BytesStart::new("soapenv:Body")))?;

    match request_element(operation) {
        Some(element) => {
            let qualified = format!("typ:{element}");
            emit(&mut writer, Event::Start(BytesStart::new(qualified.as_str())))?;
            for (name, value) in params {
                validate_name(name)?;
                write_value(&mut writer, name, value)?;
            }
            emit(&mut writer, Event::End(BytesEnd::new(qualified.as_str())))?;
        }
        None => {
            for (name, value) in params {
                validate_name(name)?;
                write_value(&mut writer, &format!("typ:{name}"), value)?;
            }
        }
    }

    emit(&mut writer, Event::End(BytesEnd::new("soapenv:Body")))?;
    emit(&mut writer, Event::End(BytesEnd::new("soapenv:Envelope")))?;

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::protocol(format!("Encoded {operation} envelope is not UTF-8: {e}")))
}

fn write_value(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => emit(writer, Event::Empty(BytesStart::new(name))),
        Value::Array(items) => {
            for item in items {
                write_value(writer, name, item)?;
            }
            Ok(())
        }
        Value::Object(fields) => {
            emit(writer, Event::Start(BytesStart::new(name)))?;
            for (field, nested) in fields {
                validate_name(field)?;
                write_value(writer, field, nested)?;
            }
            emit(writer, Event::End(BytesEnd::new(name)))
        }
        Value::String(text) => write_text(writer, name, text),
        Value::Bool(flag) => write_text(writer, name, &flag.to_string()),
        Value::Number(number) => write_text(writer, name, &number.to_string()),
    }
}

fn write_text(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    emit(writer, Event::Start(BytesStart::new(name)))?;
    if !text.is_empty() {
        emit(writer, Event::Text(BytesText::new(text)))?;
    }
    emit(writer, Event::End(BytesEnd::new(name)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::protocol(format!("Failed to encode envelope: {e}")))
}

/// Parameter names become element names and must be valid XML names.
fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(Error::protocol(format!("Invalid parameter name '{name}'")))
    }
}

/// Decode a response envelope into the operation's result tree, or the
/// remote fault it carries.
pub fn decode_response(operation: Operation, xml: &str) -> Result<Value> {
    let envelope = parse_document(xml)?;
    if envelope.name != "Envelope" {
        return Err(Error::protocol(format!(
            "Expected a SOAP envelope, found <{}>",
            envelope.name
        )));
    }

    let body = envelope
        .child("Body")
        .ok_or_else(|| Error::protocol("SOAP envelope has no body"))?;
    let payload = body
        .children
        .first()
        .ok_or_else(|| Error::protocol("SOAP body is empty"))?;

    if payload.name == "Fault" {
        return Err(parse_fault(payload));
    }

    let expected = format!("{}Response", operation.name());
    if payload.name != expected {
        return Err(Error::protocol(format!(
            "Expected <{expected}> in {operation} response, found <{}>",
            payload.name
        )));
    }

    Ok(payload.to_value())
}

fn parse_fault(fault: &XmlElement) -> Error {
    let code = fault.child("faultcode").map(|e| e.text.trim()).unwrap_or("soap:Server");
    let fault_string = fault.child("faultstring").map(|e| e.text.trim()).unwrap_or_default();

    let detail = fault.child("detail");
    let status = detail
        .and_then(|d| d.find("faultStatus"))
        .map(|e| FaultStatus::from_code(&e.text));
    let description = detail
        .and_then(|d| d.find("detailedDescription"))
        .map(|e| e.text.trim())
        .filter(|text| !text.is_empty());

    let message = match description {
        Some(description) if !fault_string.is_empty() => format!("{fault_string}: {description}"),
        Some(description) => description.to_string(),
        None => fault_string.to_string(),
    };

    Error::remote_fault(code, message, status)
}

/// Operation names declared by a service descriptor (WSDL).
pub fn descriptor_operations(xml: &str) -> Result<BTreeSet<String>> {
    let definitions = parse_document(xml)?;
    if definitions.name != "definitions" {
        return Err(Error::protocol(format!(
            "Service descriptor root is <{}>, expected <definitions>",
            definitions.name
        )));
    }

    let mut operations = Vec::new();
    definitions.descendants("operation", &mut operations);

    Ok(operations
        .into_iter()
        .filter_map(|op| op.attribute("name"))
        .map(str::to_string)
        .collect())
}
