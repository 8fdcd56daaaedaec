//! Decoders for the router's SOAP responses.
//!
//! Elements are matched by local name, so namespace prefixes chosen by the
//! firmware (`u:`, `s:`, none) do not matter.

use std::net::IpAddr;
use std::ops::ControlFlow;

use ipnet::IpNet;
use quick_xml::events::Event;
use quick_xml::Reader;

use localredirect_core::constants::{
    ELEMENT_EXTERNAL_IPV4, ELEMENT_EXTERNAL_IPV6, ELEMENT_IPV6_PREFIX, ELEMENT_PREFIX_LENGTH,
    ELEMENT_VALID_LIFETIME, LIFETIME_WITHDRAWN,
};
use localredirect_core::error::{RedirectError, Result};

/// Decodes a `GetExternalIPAddress` response.
///
/// The first `NewExternalIPAddress` element wins. Its text must be an IP
/// literal of either family.
pub fn parse_external_ipv4(body: &str) -> Result<IpAddr> {
    let mut address = None;
    walk_fields(body, &[ELEMENT_EXTERNAL_IPV4], |_, text| {
        address = Some(text.to_string());
        ControlFlow::Break(())
    })?;

    let address = address.ok_or_else(|| {
        RedirectError::MalformedResponse(format!("no {ELEMENT_EXTERNAL_IPV4} element"))
    })?;
    parse_ip(ELEMENT_EXTERNAL_IPV4, &address)
}

/// Decodes an `X_AVM_DE_GetExternalIPv6Address` response.
///
/// Returns `Ok(None)` as soon as a valid lifetime of `0` is seen: the router
/// has no IPv6 address assigned right now.
pub fn parse_external_ipv6(body: &str) -> Result<Option<IpAddr>> {
    let mut withdrawn = false;
    let mut address = String::new();

    walk_fields(body, &[ELEMENT_VALID_LIFETIME, ELEMENT_EXTERNAL_IPV6], |field, text| {
        if field == ELEMENT_VALID_LIFETIME {
            if text == LIFETIME_WITHDRAWN {
                withdrawn = true;
                return ControlFlow::Break(());
            }
        } else {
            address = text.to_string();
        }
        ControlFlow::Continue(())
    })?;

    if withdrawn {
        return Ok(None);
    }
    if address.is_empty() {
        return Err(RedirectError::MissingField(ELEMENT_EXTERNAL_IPV6.into()));
    }

    parse_ip(ELEMENT_EXTERNAL_IPV6, &address).map(Some)
}

/// Decodes an `X_AVM_DE_GetIPv6Prefix` response into a masked CIDR block.
///
/// Same withdrawal rule as [`parse_external_ipv6`]. The network address comes
/// from `NewIPv6Prefix` and the length from `NewPrefixLength`.
pub fn parse_ipv6_prefix(body: &str) -> Result<Option<IpNet>> {
    let mut withdrawn = false;
    let mut prefix = String::new();
    let mut length = String::new();

    walk_fields(
        body,
        &[ELEMENT_VALID_LIFETIME, ELEMENT_IPV6_PREFIX, ELEMENT_PREFIX_LENGTH],
        |field, text| {
            match field {
                ELEMENT_VALID_LIFETIME if text == LIFETIME_WITHDRAWN => {
                    withdrawn = true;
                    return ControlFlow::Break(());
                }
                ELEMENT_IPV6_PREFIX => prefix = text.to_string(),
                ELEMENT_PREFIX_LENGTH => length = text.to_string(),
                _ => {}
            }
            ControlFlow::Continue(())
        },
    )?;

    if withdrawn {
        return Ok(None);
    }
    if prefix.is_empty() {
        return Err(RedirectError::MissingField(ELEMENT_IPV6_PREFIX.into()));
    }
    if length.is_empty() {
        return Err(RedirectError::MissingField(ELEMENT_PREFIX_LENGTH.into()));
    }

    let network = parse_ip(ELEMENT_IPV6_PREFIX, &prefix)?;
    let length: u8 = length.parse().map_err(|_| {
        RedirectError::MalformedResponse(format!("{ELEMENT_PREFIX_LENGTH} is not a length: '{length}'"))
    })?;
    let block = IpNet::new(network, length).map_err(|_| {
        RedirectError::MalformedResponse(format!("'{prefix}/{length}' is not a valid CIDR block"))
    })?;

    Ok(Some(block.trunc()))
}

/// Extracts the human-readable reason from a SOAP fault, if the body is one.
///
/// UPnP puts the useful text in `errorDescription`; plain SOAP faults only
/// carry `faultstring`.
pub fn parse_fault(body: &str) -> Option<String> {
    let mut fault_string = None;
    let mut description = None;

    walk_fields(body, &["faultstring", "errorDescription"], |field, text| {
        if field == "errorDescription" {
            description = Some(text.to_string());
            return ControlFlow::Break(());
        }
        fault_string = Some(text.to_string());
        ControlFlow::Continue(())
    })
    .ok()?;

    description.or(fault_string).filter(|text| !text.is_empty())
}

/// Feeds the trimmed text of every element named in `fields` to `visit`, in
/// document order, until `visit` breaks or the document ends.
fn walk_fields<F>(body: &str, fields: &[&'static str], mut visit: F) -> Result<()>
where
    F: FnMut(&'static str, &str) -> ControlFlow<()>,
{
    let mut reader = Reader::from_str(body);

    loop {
        let event = reader
            .read_event()
            .map_err(|e| RedirectError::MalformedResponse(format!("invalid XML: {e}")))?;

        let flow = match event {
            Event::Start(start) => {
                let Some(field) = lookup(fields, start.local_name().as_ref()) else {
                    continue;
                };
                let text = reader
                    .read_text(start.name())
                    .map_err(|e| RedirectError::MalformedResponse(format!("invalid XML: {e}")))?;
                visit(field, text.trim())
            }
            Event::Empty(empty) => match lookup(fields, empty.local_name().as_ref()) {
                Some(field) => visit(field, ""),
                None => continue,
            },
            Event::Eof => return Ok(()),
            _ => continue,
        };

        if flow.is_break() {
            return Ok(());
        }
    }
}

fn lookup(fields: &[&'static str], local_name: &[u8]) -> Option<&'static str> {
    fields.iter().copied().find(|field| field.as_bytes() == local_name)
}

fn parse_ip(field: &str, text: &str) -> Result<IpAddr> {
    text.parse()
        .map_err(|_| RedirectError::MalformedResponse(format!("{field} is not an IP address: '{text}'")))
}
