//! SOAP request framing for the WAN IP connection service.

use localredirect_core::constants::WAN_IP_CONNECTION_SERVICE;

/// Builds the request envelope for a parameterless action.
pub fn envelope(action: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="utf-8"?>"#,
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" "#,
            r#"s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
            r#"<s:Body><u:{action} xmlns:u="{service}"/></s:Body>"#,
            r#"</s:Envelope>"#,
        ),
        action = action,
        service = WAN_IP_CONNECTION_SERVICE,
    )
}

/// Value of the `SOAPAction` header, quotes included.
pub fn soap_action(action: &str) -> String {
    format!("\"{WAN_IP_CONNECTION_SERVICE}#{action}\"")
}
