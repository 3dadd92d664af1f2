/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use crate::decode::XmlDecodeError;
use std::borrow::Cow;

/// Unescape XML encoded characters
///
/// This function will unescape the 4 literal escapes:
/// - `&lt;`, `&gt;`, `&amp;`, `&quot;`, and `&apos;`
/// - Decimal escapes: `&#123;`
/// - Hex escapes: `&#xD;`
///
/// If no escape sequences are present, Cow<&'str> will be returned, avoiding the need
/// to copy the String.
pub fn unescape(s: &str) -> Result<Cow<'_, str>, XmlDecodeError> {
    // no &, no need to escape anything
    if !s.contains('&') {
        return Ok(Cow::Borrowed(s));
    }
    let mut res = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find('&') {
        res.push_str(&rest[..start]);
        rest = &rest[start..];
        let end = rest.find(';').ok_or_else(|| XmlDecodeError::InvalidEscape {
            esc: rest.chars().take(10).collect(),
        })?;
        let entity = &rest[1..end];
        match entity {
            "lt" => res.push('<'),
            "gt" => res.push('>'),
            "amp" => res.push('&'),
            "quot" => res.push('"'),
            "apos" => res.push('\''),
            _ => res.push(numeric_escape(entity)?),
        }
        rest = &rest[end + 1..];
    }
    res.push_str(rest);
    Ok(Cow::Owned(res))
}

fn numeric_escape(entity: &str) -> Result<char, XmlDecodeError> {
    let invalid = || XmlDecodeError::InvalidEscape {
        esc: format!("&{};", entity),
    };
    let code_point = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).map_err(|_| invalid())?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().map_err(|_| invalid())?
    } else {
        return Err(invalid());
    };
    std::char::from_u32(code_point).ok_or_else(invalid)
}
