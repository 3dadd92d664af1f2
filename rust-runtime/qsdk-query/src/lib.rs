/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

//! Abstractions for the AWS Query and EC2 Query wire formats.
//!
//! Both formats send a `application/x-www-form-urlencoded` body. They differ in how lists and
//! maps are addressed, which is captured by [`QueryFlavor`].

mod error;
mod params;

pub use error::QueryWriteError;
pub use params::{QueryParams, QueryValue};

use chrono::{DateTime, Utc};
use std::borrow::Cow;
use std::time::SystemTime;
use urlencoding::encode;

/// The query dialect a service speaks
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryFlavor {
    /// `awsQuery`: lists are `Name.member.N` unless flattened, maps are `Name.entry.N.key`
    Aws,
    /// `ec2Query`: every list and map is flattened, `Name.N`
    Ec2,
}

impl QueryFlavor {
    fn flattens(self) -> bool {
        matches!(self, QueryFlavor::Ec2)
    }
}

/// Types that can be written as query parameters
pub trait SerializeQuery {
    fn serialize_query(&self, writer: &mut QueryWriter<'_>) -> Result<(), QueryWriteError>;
}

impl<T: SerializeQuery + ?Sized> SerializeQuery for &T {
    fn serialize_query(&self, writer: &mut QueryWriter<'_>) -> Result<(), QueryWriteError> {
        (**self).serialize_query(writer)
    }
}

impl<T: SerializeQuery + ?Sized> SerializeQuery for Box<T> {
    fn serialize_query(&self, writer: &mut QueryWriter<'_>) -> Result<(), QueryWriteError> {
        (**self).serialize_query(writer)
    }
}

impl SerializeQuery for () {
    fn serialize_query(&self, _writer: &mut QueryWriter<'_>) -> Result<(), QueryWriteError> {
        Ok(())
    }
}

/// Writes a query body, starting with the `Action` and `Version` parameters
///
/// ```rust
/// use qsdk_query::{QueryFlavor, QueryWriter};
///
/// let mut out = String::new();
/// let mut writer = QueryWriter::new(&mut out, QueryFlavor::Ec2, "DescribeRegions", "2016-11-15");
/// writer.prefix("RegionName").start_list(None).entry().string("us-east-1");
/// writer.finish();
/// assert_eq!(out, "Action=DescribeRegions&Version=2016-11-15&RegionName.1=us-east-1");
/// ```
#[derive(Debug)]
pub struct QueryWriter<'a> {
    output: &'a mut String,
    flavor: QueryFlavor,
}

impl<'a> QueryWriter<'a> {
    pub fn new(
        output: &'a mut String,
        flavor: QueryFlavor,
        action: &str,
        version: &str,
    ) -> Self {
        output.push_str("Action=");
        output.push_str(&encode(action));
        output.push_str("&Version=");
        output.push_str(&encode(version));
        QueryWriter { output, flavor }
    }

    pub fn flavor(&self) -> QueryFlavor {
        self.flavor
    }

    /// Start a value named `prefix`
    pub fn prefix(&mut self, prefix: &str) -> QueryValueWriter<'_> {
        QueryValueWriter::new(self.output, Cow::Owned(prefix.to_string()), self.flavor)
    }

    pub fn finish(self) {
        // Calling this drops the writer and releases the output borrow
    }
}

/// Writes a single value, or the start of a list, map, or structure, at a given prefix
#[must_use]
#[derive(Debug)]
pub struct QueryValueWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flavor: QueryFlavor,
}

impl<'a> QueryValueWriter<'a> {
    fn new(output: &'a mut String, prefix: Cow<'a, str>, flavor: QueryFlavor) -> Self {
        QueryValueWriter {
            output,
            prefix,
            flavor,
        }
    }

    /// Starts a new prefix for a member of this structure
    pub fn prefix(&mut self, prefix: &str) -> QueryValueWriter<'_> {
        QueryValueWriter::new(
            self.output,
            Cow::Owned(format!("{}.{}", self.prefix, prefix)),
            self.flavor,
        )
    }

    /// Starts a list. EC2 lists are always flattened, AWS Query lists use `member`
    /// (or `member_override`) unless [`start_flat_list`](Self::start_flat_list) is used.
    pub fn start_list(self, member_override: Option<&str>) -> QueryListWriter<'a> {
        let flat = self.flavor.flattens();
        QueryListWriter::new(self.output, self.prefix, flat, member_override, self.flavor)
    }

    /// Starts a list that is flattened regardless of flavor
    pub fn start_flat_list(self) -> QueryListWriter<'a> {
        QueryListWriter::new(self.output, self.prefix, true, None, self.flavor)
    }

    /// Starts a map. Key and value names default to `key` and `value`.
    pub fn start_map(self, key_name: Option<&str>, value_name: Option<&str>) -> QueryMapWriter<'a> {
        let flat = self.flavor.flattens();
        QueryMapWriter::new(
            self.output,
            self.prefix,
            flat,
            key_name.unwrap_or("key"),
            value_name.unwrap_or("value"),
            self.flavor,
        )
    }

    pub fn boolean(mut self, value: bool) {
        self.write_param_name();
        self.output.push_str(match value {
            true => "true",
            _ => "false",
        });
    }

    pub fn string(mut self, value: &str) {
        self.write_param_name();
        self.output.push_str(&encode(value));
    }

    pub fn integer(mut self, value: i64) {
        self.write_param_name();
        self.output.push_str(&value.to_string());
    }

    /// Non-finite floats are written the way the query protocols spell them
    pub fn float(mut self, value: f64) {
        self.write_param_name();
        let formatted = if value.is_nan() {
            "NaN".to_string()
        } else if value.is_infinite() {
            match value.is_sign_positive() {
                true => "Infinity".to_string(),
                false => "-Infinity".to_string(),
            }
        } else {
            value.to_string()
        };
        self.output.push_str(&formatted);
    }

    /// ISO-8601 timestamp in UTC with second precision
    pub fn date_time(mut self, value: SystemTime) {
        self.write_param_name();
        let formatted = DateTime::<Utc>::from(value).format("%Y-%m-%dT%H:%M:%SZ");
        self.output.push_str(&encode(&formatted.to_string()));
    }

    fn write_param_name(&mut self) {
        self.output.push('&');
        self.output.push_str(&self.prefix);
        self.output.push('=');
    }
}

#[must_use]
#[derive(Debug)]
pub struct QueryListWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flat: bool,
    member_override: Option<String>,
    flavor: QueryFlavor,
    next_index: usize,
}

impl<'a> QueryListWriter<'a> {
    fn new(
        output: &'a mut String,
        prefix: Cow<'a, str>,
        flat: bool,
        member_override: Option<&str>,
        flavor: QueryFlavor,
    ) -> Self {
        QueryListWriter {
            output,
            prefix,
            flat,
            member_override: member_override.map(|m| m.to_string()),
            flavor,
            next_index: 1,
        }
    }

    pub fn entry(&mut self) -> QueryValueWriter<'_> {
        let prefix = if self.flat {
            format!("{}.{}", self.prefix, self.next_index)
        } else {
            format!(
                "{}.{}.{}",
                self.prefix,
                self.member_override.as_deref().unwrap_or("member"),
                self.next_index
            )
        };
        self.next_index += 1;
        QueryValueWriter::new(self.output, Cow::Owned(prefix), self.flavor)
    }

    pub fn finish(self) {
        // Calling this drops the writer and releases the output borrow.
        // An empty AWS Query list is written as `Name=`.
        if self.next_index == 1 && !self.flat {
            QueryValueWriter::new(self.output, self.prefix, self.flavor).write_param_name();
        }
    }
}

#[must_use]
#[derive(Debug)]
pub struct QueryMapWriter<'a> {
    output: &'a mut String,
    prefix: Cow<'a, str>,
    flat: bool,
    key_name: String,
    value_name: String,
    flavor: QueryFlavor,
    next_index: usize,
}

impl<'a> QueryMapWriter<'a> {
    fn new(
        output: &'a mut String,
        prefix: Cow<'a, str>,
        flat: bool,
        key_name: &str,
        value_name: &str,
        flavor: QueryFlavor,
    ) -> Self {
        QueryMapWriter {
            output,
            prefix,
            flat,
            key_name: key_name.to_string(),
            value_name: value_name.to_string(),
            flavor,
            next_index: 1,
        }
    }

    /// Writes the key of the next entry and returns the writer for its value
    pub fn entry(&mut self, key: &str) -> QueryValueWriter<'_> {
        let entry = if self.flat {
            format!("{}.{}", self.prefix, self.next_index)
        } else {
            format!("{}.entry.{}", self.prefix, self.next_index)
        };
        self.next_index += 1;
        self.output.push('&');
        self.output.push_str(&format!("{}.{}=", entry, self.key_name));
        self.output.push_str(&encode(key));
        QueryValueWriter::new(
            self.output,
            Cow::Owned(format!("{}.{}", entry, self.value_name)),
            self.flavor,
        )
    }

    pub fn finish(self) {
        // Calling this drops the writer and releases the output borrow
    }
}

#[cfg(test)]
mod tests {
    use crate::{QueryFlavor, QueryWriter};
    use pretty_assertions::assert_eq;
    use std::time::{Duration, UNIX_EPOCH};

    fn write(flavor: QueryFlavor, f: impl FnOnce(&mut QueryWriter<'_>)) -> String {
        let mut out = String::new();
        let mut writer = QueryWriter::new(&mut out, flavor, "SomeAction", "1.0");
        f(&mut writer);
        writer.finish();
        out
    }

    #[test]
    fn action_and_version_only() {
        assert_eq!(
            write(QueryFlavor::Aws, |_| {}),
            "Action=SomeAction&Version=1.0"
        );
    }

    #[test]
    fn scalars() {
        let out = write(QueryFlavor::Aws, |writer| {
            writer.prefix("Str").string("a value&more");
            writer.prefix("Bool").boolean(true);
            writer.prefix("Int").integer(-5);
            writer.prefix("Float").float(0.5);
            writer.prefix("Nan").float(f64::NAN);
            writer.prefix("NegInf").float(f64::NEG_INFINITY);
            writer
                .prefix("Time")
                .date_time(UNIX_EPOCH + Duration::from_secs(1_440_938_160));
        });
        assert_eq!(
            out,
            "Action=SomeAction&Version=1.0\
             &Str=a%20value%26more\
             &Bool=true\
             &Int=-5\
             &Float=0.5\
             &Nan=NaN\
             &NegInf=-Infinity\
             &Time=2015-08-30T12%3A36%3A00Z"
        );
    }

    #[test]
    fn nested_structures() {
        let out = write(QueryFlavor::Aws, |writer| {
            let mut filter = writer.prefix("Filter");
            filter.prefix("Name").string("tag");
            filter.prefix("Inner").prefix("Deep").integer(1);
        });
        assert_eq!(
            out,
            "Action=SomeAction&Version=1.0&Filter.Name=tag&Filter.Inner.Deep=1"
        );
    }

    #[test]
    fn aws_query_lists() {
        let out = write(QueryFlavor::Aws, |writer| {
            let mut list = writer.prefix("Names").start_list(None);
            list.entry().string("a");
            list.entry().string("b");
            list.finish();
            let mut list = writer.prefix("Ids").start_list(Some("item"));
            list.entry().integer(1);
            list.finish();
            let mut flat = writer.prefix("Flat").start_flat_list();
            flat.entry().string("x");
            flat.finish();
            writer.prefix("Empty").start_list(None).finish();
        });
        assert_eq!(
            out,
            "Action=SomeAction&Version=1.0\
             &Names.member.1=a&Names.member.2=b\
             &Ids.item.1=1\
             &Flat.1=x\
             &Empty="
        );
    }

    #[test]
    fn ec2_lists_are_flat() {
        let out = write(QueryFlavor::Ec2, |writer| {
            let mut list = writer.prefix("InstanceId").start_list(None);
            list.entry().string("i-1");
            list.entry().string("i-2");
            list.finish();
            writer.prefix("Empty").start_list(None).finish();
            let mut filters = writer.prefix("Filter").start_list(None);
            let mut filter = filters.entry();
            filter.prefix("Name").string("tag:env");
            let mut values = filter.prefix("Value").start_list(None);
            values.entry().string("prod");
            values.finish();
            filters.finish();
        });
        assert_eq!(
            out,
            "Action=SomeAction&Version=1.0\
             &InstanceId.1=i-1&InstanceId.2=i-2\
             &Filter.1.Name=tag%3Aenv&Filter.1.Value.1=prod"
        );
    }

    #[test]
    fn maps() {
        let out = write(QueryFlavor::Aws, |writer| {
            let mut map = writer.prefix("Attributes").start_map(None, None);
            map.entry("color").string("red");
            map.finish();
            let mut map = writer.prefix("Tags").start_map(Some("Name"), Some("Val"));
            map.entry("k").integer(1);
            map.finish();
        });
        assert_eq!(
            out,
            "Action=SomeAction&Version=1.0\
             &Attributes.entry.1.key=color&Attributes.entry.1.value=red\
             &Tags.entry.1.Name=k&Tags.entry.1.Val=1"
        );

        let out = write(QueryFlavor::Ec2, |writer| {
            let mut map = writer.prefix("Attributes").start_map(None, None);
            map.entry("color").string("red");
            map.finish();
        });
        assert_eq!(
            out,
            "Action=SomeAction&Version=1.0&Attributes.1.key=color&Attributes.1.value=red"
        );
    }
}
