/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0.
 */

use http::header::{AUTHORIZATION, CONTENT_LENGTH};
use http::HeaderName;
use pretty_assertions::assert_eq;
use qsdk_auth::provider::{provide_credentials_fn, CredentialsError};
use qsdk_auth::Credentials;
use qsdk_client::config::{ConfigError, SdkConfig, TimeoutConfig};
use qsdk_client::retry::RetryConfig;
use qsdk_client::test_connection::{NeverConnection, TestConnection};
use qsdk_client::Client;
use qsdk_http::body::SdkBody;
use qsdk_http::handler::{handler_fn, Handlers, Phase};
use qsdk_http::operation::{Operation, OperationTable, ServiceInfo};
use qsdk_http::protocol::AwsQuery;
use qsdk_http::request_id::RequestId;
use qsdk_http::result::SdkError;
use qsdk_query::QueryParams;
use qsdk_types::Region;
use qsdk_xml::{try_data, DeserializeXml, Node, ScopedDecoder, XmlDecodeError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

const DESCRIBE_REGIONS: Operation = Operation::post("DescribeRegions");
const EC2_ENDPOINT: &str = "https://ec2.us-east-1.amazonaws.com/";
const DESCRIBE_REGIONS_BODY: &str = "Action=DescribeRegions&Version=2016-11-15";
const DESCRIBE_REGIONS_RESPONSE: &str = r#"<DescribeRegionsResponse xmlns="http://ec2.amazonaws.com/doc/2016-11-15/">
    <requestId>59dbff89-35bd-4eac-99ed-be587EXAMPLE</requestId>
    <regionInfo>
        <item>
            <regionName>us-east-1</regionName>
            <regionEndpoint>ec2.us-east-1.amazonaws.com</regionEndpoint>
        </item>
        <item>
            <regionName>eu-west-1</regionName>
            <regionEndpoint>ec2.eu-west-1.amazonaws.com</regionEndpoint>
        </item>
    </regionInfo>
</DescribeRegionsResponse>"#;

#[derive(Debug, Default, PartialEq)]
struct DescribeRegionsOutput {
    regions: Vec<String>,
}

impl DeserializeXml for DescribeRegionsOutput {
    fn deserialize_xml(decoder: &mut ScopedDecoder<'_, '_>) -> Result<Self, XmlDecodeError> {
        let mut output = DescribeRegionsOutput::default();
        while let Some(mut tag) = decoder.next_tag() {
            if !tag.start_el().matches("regionInfo") {
                continue;
            }
            while let Some(mut item) = tag.next_tag() {
                while let Some(mut member) = item.next_tag() {
                    if member.start_el().matches("regionName") {
                        output.regions.push(try_data(&mut member)?.into_owned());
                    }
                }
            }
        }
        Ok(output)
    }
}

fn ec2() -> ServiceInfo {
    ServiceInfo::new("ec2", "2016-11-15")
}

fn config(connector: impl Into<qsdk_client::conn::Standard>) -> SdkConfig {
    SdkConfig::builder()
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::for_tests())
        .connector(connector)
        .retry_config(RetryConfig::default().with_static_base(|| 0.0))
        .build_sdk_config()
}

fn expected_request(body: &'static str) -> http::Request<SdkBody> {
    http::Request::builder()
        .method("POST")
        .uri(EC2_ENDPOINT)
        .header("content-type", "application/x-www-form-urlencoded; charset=utf-8")
        .header("x-amz-security-token", "notarealsessiontoken")
        .body(SdkBody::from(body))
        .unwrap()
}

fn response(status: u16, body: &'static str) -> http::Response<&'static str> {
    http::Response::builder().status(status).body(body).unwrap()
}

fn describe_regions(responses: Vec<http::Response<&'static str>>) -> TestConnection {
    TestConnection::new(
        responses
            .into_iter()
            .map(|response| (expected_request(DESCRIBE_REGIONS_BODY), response))
            .collect(),
    )
}

#[tokio::test]
async fn signed_request_end_to_end() {
    let conn = describe_regions(vec![response(200, DESCRIBE_REGIONS_RESPONSE)]);
    let client = Client::builder(ec2())
        .customize_request(|init| {
            init.properties_mut()
                .insert(UNIX_EPOCH + Duration::from_secs(1440938160));
        })
        .build(&config(conn.clone()), &[])
        .await
        .expect("valid config");

    let output: DescribeRegionsOutput = client
        .invoke(&DESCRIBE_REGIONS, ())
        .await
        .expect("successful response");
    assert_eq!(output.regions, vec!["us-east-1", "eu-west-1"]);

    conn.assert_requests_match(&[]);
    let requests = conn.requests();
    let sent = &requests[0].actual;
    assert_eq!(sent.headers()["x-amz-date"], "20150830T123600Z");
    assert_eq!(
        sent.headers()[CONTENT_LENGTH],
        DESCRIBE_REGIONS_BODY.len().to_string().as_str()
    );
    let authorization = sent.headers()[AUTHORIZATION]
        .to_str()
        .expect("valid header");
    assert!(
        authorization.starts_with(
            "AWS4-HMAC-SHA256 Credential=ANOTREAL/20150830/us-east-1/ec2/aws4_request, SignedHeaders="
        ),
        "unexpected authorization: {}",
        authorization
    );
    assert!(authorization.contains("x-amz-date"));
}

#[tokio::test]
async fn query_input_and_response_metadata() {
    let conn = TestConnection::new(vec![(
        expected_request(
            "Action=DescribeRegions&Version=2016-11-15&RegionName.1=us-east-1\
             &RegionName.2=eu-west-1&AllRegions=true",
        ),
        http::Response::builder()
            .status(200)
            .header("x-amzn-requestid", "from-header")
            .body(DESCRIBE_REGIONS_RESPONSE)
            .unwrap(),
    )]);
    let client = Client::new(ec2(), &config(conn.clone()), &[])
        .await
        .expect("valid config");
    let input = QueryParams::new()
        .param("RegionName", vec!["us-east-1", "eu-west-1"])
        .param("AllRegions", true);
    let success = client
        .invoke_raw::<Node>(&DESCRIBE_REGIONS, input)
        .await
        .expect("successful response");

    let regions: Vec<_> = success
        .parsed
        .child("regionInfo")
        .expect("regionInfo")
        .children_named("item")
        .filter_map(|item| item.child("regionName"))
        .map(|name| name.text.as_str())
        .collect();
    assert_eq!(regions, vec!["us-east-1", "eu-west-1"]);
    assert_eq!(success.metadata.request_id(), Some("from-header"));
    assert_eq!(success.request_id(), Some("from-header"));
    assert_eq!(success.raw.status(), 200);
    conn.assert_requests_match(&[]);
}

type Log = Arc<Mutex<Vec<&'static str>>>;

fn record_phases(handlers: &mut Handlers, log: &Log) {
    for phase in [
        Phase::Build,
        Phase::Sign,
        Phase::Send,
        Phase::Unmarshal,
        Phase::UnmarshalMeta,
        Phase::UnmarshalError,
    ] {
        let log = log.clone();
        handlers.phase_mut(phase).push_back_named(
            format!("test.{}", phase),
            handler_fn(move |_| {
                log.lock().unwrap().push(phase.as_str());
                Ok(())
            }),
        );
    }
}

#[tokio::test]
async fn phases_run_in_order() {
    let log = Log::default();
    let conn = describe_regions(vec![
        response(200, DESCRIBE_REGIONS_RESPONSE),
        response(
            400,
            "<Response><Errors><Error><Code>InvalidParameterValue</Code>\
             <Message>bad</Message></Error></Errors><RequestID>abc</RequestID></Response>",
        ),
    ]);
    let client = Client::builder(ec2())
        .customize_client({
            let log = log.clone();
            move |handlers| record_phases(handlers, &log)
        })
        .build(&config(conn.clone()), &[])
        .await
        .expect("valid config");

    client
        .invoke::<Node>(&DESCRIBE_REGIONS, ())
        .await
        .expect("successful response");
    assert_eq!(
        std::mem::take(&mut *log.lock().unwrap()),
        vec!["Build", "Sign", "Send", "Unmarshal", "UnmarshalMeta"]
    );

    client
        .invoke::<Node>(&DESCRIBE_REGIONS, ())
        .await
        .expect_err("error response");
    assert_eq!(
        *log.lock().unwrap(),
        vec!["Build", "Sign", "Send", "UnmarshalError", "UnmarshalMeta"]
    );
}

#[tokio::test]
async fn throttled_requests_are_retried() {
    let meta_calls = Arc::new(AtomicUsize::new(0));
    let credential_calls = Arc::new(AtomicUsize::new(0));
    let conn = describe_regions(vec![
        response(503, ""),
        response(200, DESCRIBE_REGIONS_RESPONSE),
    ]);
    let config = SdkConfig::builder()
        .region(Region::new("us-east-1"))
        .credentials_provider(provide_credentials_fn({
            let credential_calls = credential_calls.clone();
            move || {
                credential_calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(Credentials::for_tests()) }
            }
        }))
        .connector(conn.clone())
        .retry_config(RetryConfig::default().with_static_base(|| 0.0))
        .build_sdk_config();
    let client = Client::builder(ec2())
        .customize_client({
            let meta_calls = meta_calls.clone();
            move |handlers| {
                handlers.phase_mut(Phase::UnmarshalMeta).push_back_named(
                    "test.CountAttempts",
                    handler_fn(move |_| {
                        meta_calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                );
            }
        })
        .build(&config, &[])
        .await
        .expect("valid config");

    let output: DescribeRegionsOutput = client
        .invoke(&DESCRIBE_REGIONS, ())
        .await
        .expect("the second attempt succeeds");
    assert_eq!(output.regions.len(), 2);
    assert_eq!(conn.requests().len(), 2);
    assert_eq!(meta_calls.load(Ordering::SeqCst), 2);
    // one call validates the configuration, then one per attempt
    assert_eq!(credential_calls.load(Ordering::SeqCst), 3);
    conn.assert_requests_match(&[]);
}

#[tokio::test(start_paused = true)]
async fn retry_after_sets_the_retry_delay() {
    let conn = describe_regions(vec![
        http::Response::builder()
            .status(503)
            .header("retry-after", "5")
            .body("")
            .unwrap(),
        response(200, DESCRIBE_REGIONS_RESPONSE),
    ]);
    let client = Client::new(ec2(), &config(conn.clone()), &[])
        .await
        .expect("valid config");

    let start = tokio::time::Instant::now();
    let output: DescribeRegionsOutput = client
        .invoke(&DESCRIBE_REGIONS, ())
        .await
        .expect("the second attempt succeeds");
    assert_eq!(output.regions.len(), 2);
    assert_eq!(conn.requests().len(), 2);
    // the static backoff of the config is zero
    assert!(start.elapsed() >= Duration::from_secs(5), "{:?}", start.elapsed());
}

#[tokio::test]
async fn service_errors_are_decoded() {
    let conn = describe_regions(vec![response(
        400,
        r#"<Response>
            <Errors>
                <Error>
                    <Code>InvalidParameterValue</Code>
                    <Message>Invalid region name: mars-1</Message>
                </Error>
            </Errors>
            <RequestID>ea966190-f9aa-478e-9ede-example</RequestID>
        </Response>"#,
    )]);
    let client = Client::new(ec2(), &config(conn.clone()), &[])
        .await
        .expect("valid config");
    let err = client
        .invoke::<Node>(&DESCRIBE_REGIONS, ())
        .await
        .expect_err("error response");
    let service_error = err.service_error().expect("service error");
    assert_eq!(service_error.code(), "InvalidParameterValue");
    assert_eq!(service_error.message(), "Invalid region name: mars-1");
    assert_eq!(
        err.request_id(),
        Some("ea966190-f9aa-478e-9ede-example")
    );
    // client errors are not retried
    assert_eq!(conn.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn attempts_time_out() {
    let meta_calls = Arc::new(AtomicUsize::new(0));
    let conn = NeverConnection::new();
    let config = SdkConfig::builder()
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::for_tests())
        .connector(conn.clone())
        .retry_config(RetryConfig::default().with_static_base(|| 0.0))
        .timeout_config(TimeoutConfig::new().with_attempt_timeout(Duration::from_secs(1)))
        .build_sdk_config();
    let client = Client::builder(ec2())
        .customize_client({
            let meta_calls = meta_calls.clone();
            move |handlers| {
                handlers.phase_mut(Phase::UnmarshalMeta).push_back_named(
                    "test.CountAttempts",
                    handler_fn(move |_| {
                        meta_calls.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }),
                );
            }
        })
        .build(&config, &[])
        .await
        .expect("valid config");

    let err = client
        .invoke::<Node>(&DESCRIBE_REGIONS, ())
        .await
        .expect_err("the connection never responds");
    assert!(matches!(err, SdkError::TransportError(_)), "{:?}", err);
    assert_eq!(conn.num_calls(), 3);
    assert_eq!(meta_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn clients_are_shared_across_tasks() {
    let conn = describe_regions(
        (0..10)
            .map(|_| response(200, DESCRIBE_REGIONS_RESPONSE))
            .collect(),
    );
    let client = Client::new(ec2(), &config(conn.clone()), &[])
        .await
        .expect("valid config");
    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .invoke::<DescribeRegionsOutput>(&DESCRIBE_REGIONS, ())
                    .await
            })
        })
        .collect();
    for task in tasks {
        let output = task.await.expect("task completes").expect("success");
        assert_eq!(output.regions, vec!["us-east-1", "eu-west-1"]);
    }
    conn.assert_requests_match(&[]);
}

#[tokio::test]
async fn unavailable_credentials_fail_construction() {
    let conn = describe_regions(vec![]);
    let config = SdkConfig::builder()
        .region(Region::new("us-east-1"))
        .credentials_provider(provide_credentials_fn(|| async {
            Err(CredentialsError::CredentialsNotLoaded)
        }))
        .connector(conn.clone())
        .build_sdk_config();
    let err = Client::new(ec2(), &config, &[])
        .await
        .expect_err("no credentials");
    assert!(matches!(err, ConfigError::CredentialsUnavailable(_)));
    assert!(conn.requests().is_empty());
}

#[tokio::test]
async fn malformed_responses_are_not_retried() {
    let conn = describe_regions(vec![response(200, "<DescribeRegionsResponse><regionInfo>")]);
    let client = Client::new(ec2(), &config(conn.clone()), &[])
        .await
        .expect("valid config");
    let err = client
        .invoke::<DescribeRegionsOutput>(&DESCRIBE_REGIONS, ())
        .await
        .expect_err("truncated document");
    assert!(matches!(err, SdkError::UnmarshalError(_)), "{:?}", err);
    assert_eq!(conn.requests().len(), 1);
}

#[tokio::test]
async fn named_operations_with_aws_query() {
    let conn = TestConnection::new(vec![(
        http::Request::builder()
            .method("POST")
            .uri("https://sts.us-east-1.amazonaws.com/")
            .body(SdkBody::from(
                "Action=GetCallerIdentity&Version=2011-06-15",
            ))
            .unwrap(),
        response(
            200,
            r#"<GetCallerIdentityResponse xmlns="https://sts.amazonaws.com/doc/2011-06-15/">
                <GetCallerIdentityResult>
                    <Arn>arn:aws:iam::123456789012:user/Alice</Arn>
                    <Account>123456789012</Account>
                </GetCallerIdentityResult>
                <ResponseMetadata>
                    <RequestId>01234567-89ab-cdef-0123-456789abcdef</RequestId>
                </ResponseMetadata>
            </GetCallerIdentityResponse>"#,
        ),
    )]);
    let client = Client::builder(ServiceInfo::new("sts", "2011-06-15"))
        .protocol(AwsQuery)
        .operations(OperationTable::new().with(Operation::post("GetCallerIdentity")))
        .build(&config(conn.clone()), &[])
        .await
        .expect("valid config");

    let output = client
        .invoke_named("GetCallerIdentity", ())
        .await
        .expect("successful response");
    assert_eq!(
        output.child("Account").map(|account| account.text.as_str()),
        Some("123456789012")
    );
    let ignore = [HeaderName::from_static("x-amz-security-token")];
    conn.assert_requests_match(&ignore);
    assert!(conn.requests()[0]
        .actual
        .headers()[AUTHORIZATION]
        .to_str()
        .unwrap()
        .contains("/us-east-1/sts/aws4_request"));
}
