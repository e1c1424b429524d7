// Integration tests for the commit dispatcher: the two independent
// mutations, the cascade wire format, and the local cache mirror.
use mockito::{Matcher, Server};
use serde_json::json;
use vetmovil_core::cache::RateCache;
use vetmovil_core::client::ApiClient;
use vetmovil_core::context::TestContext;
use vetmovil_core::error::WorkflowError;
use vetmovil_core::model::{CascadeTarget, RateSnapshot, RoundingOption, RoundingPolicy};
use vetmovil_core::workflow::dispatch;
use vetmovil_core::workflow::gate::{COUNTDOWN_SECONDS, CommitRequest, RateGate, SaveOutcome};

fn client_for(server: &mockito::ServerGuard) -> ApiClient {
    ApiClient::new(&server.url(), None, true).unwrap()
}

/// Original rate "420", user enters "430", selects USD, waits out the
/// countdown, confirms. The wire body must carry the cascade instruction
/// and the cache must store the plain value.
#[tokio::test]
async fn confirmed_usd_cascade_sends_flag_and_mirrors_cache() {
    let mut server = Server::new_async().await;
    let ctx = TestContext::new();

    let put_mock = server
        .mock("PUT", "/moneda/updateMoneda")
        .match_body(Matcher::Json(json!({
            "value": "430",
            "config": { "isCambioCostosProductos": true, "tipo": "cambiar usd" }
        })))
        .with_status(200)
        .create_async()
        .await;

    // Drive the gate the way the UI would.
    let mut gate = RateGate::new(RateSnapshot::new("420"));
    gate.set_value("430");
    assert_eq!(gate.request_save().unwrap(), SaveOutcome::ChooseCascadeTarget);
    gate.choose_target(CascadeTarget::Usd).unwrap();
    for _ in 0..COUNTDOWN_SECONDS {
        gate.tick();
    }
    let request = gate.confirm().unwrap();

    let outcome = dispatch::commit(&client_for(&server), &ctx, &request, None).await;

    assert!(outcome.rate_committed());
    assert!(outcome.rounding.is_none());
    assert_eq!(RateCache::load(&ctx).unwrap().as_deref(), Some("430"));
    put_mock.assert_async().await;
}

/// "Skip" must produce a body with no cascade config at all.
#[tokio::test]
async fn skip_sends_plain_update() {
    let mut server = Server::new_async().await;
    let ctx = TestContext::new();

    let put_mock = server
        .mock("PUT", "/moneda/updateMoneda")
        .match_body(Matcher::Json(json!({ "value": "100" })))
        .with_status(200)
        .create_async()
        .await;

    let mut gate = RateGate::new(RateSnapshot::new("420"));
    gate.set_value("100");
    gate.request_save().unwrap();
    let request = gate.skip_cascade().unwrap();
    assert_eq!(request.cascade, None);

    let outcome = dispatch::commit(&client_for(&server), &ctx, &request, None).await;
    assert!(outcome.rate_committed());
    put_mock.assert_async().await;
}

/// Rate commits, rounding update fails: both outcomes are reported
/// separately, nothing is rolled back, the cache mirror stands.
#[tokio::test]
async fn partial_success_is_reported_separately() {
    let mut server = Server::new_async().await;
    let ctx = TestContext::new();

    server
        .mock("PUT", "/moneda/updateMoneda")
        .with_status(200)
        .create_async()
        .await;
    let rounding_mock = server
        .mock("PUT", "/redondeo/updateRedondeo")
        .match_body(Matcher::Json(json!({
            "value": "Excess20",
            "isRedondeoFromPlus": "true"
        })))
        .with_status(500)
        .with_body(r#"{"message":"rounding table locked"}"#)
        .create_async()
        .await;

    let request = CommitRequest {
        rate_value: "430".to_string(),
        cascade: None,
    };
    let policy = RoundingPolicy {
        option: RoundingOption::Excess20,
        credit_excess_to_bonus: true,
    };

    let outcome = dispatch::commit(&client_for(&server), &ctx, &request, Some(&policy)).await;

    assert!(outcome.rate_committed());
    assert_eq!(
        outcome.rounding,
        Some(Err(WorkflowError::Http {
            status: 500,
            message: "rounding table locked".to_string(),
        }))
    );
    assert_eq!(RateCache::load(&ctx).unwrap().as_deref(), Some("430"));
    rounding_mock.assert_async().await;
}

/// No configured policy means the rounding endpoint is never touched.
#[tokio::test]
async fn rounding_is_not_sent_when_unconfigured() {
    let mut server = Server::new_async().await;
    let ctx = TestContext::new();

    server
        .mock("PUT", "/moneda/updateMoneda")
        .with_status(200)
        .create_async()
        .await;
    let rounding_mock = server
        .mock("PUT", "/redondeo/updateRedondeo")
        .expect(0)
        .create_async()
        .await;

    let request = CommitRequest {
        rate_value: "5".to_string(),
        cascade: None,
    };
    let outcome = dispatch::commit(&client_for(&server), &ctx, &request, None).await;

    assert!(outcome.rate_committed());
    assert!(outcome.rounding.is_none());
    rounding_mock.assert_async().await;
}

/// A failed rate update leaves the cache untouched, while the rounding
/// update still goes out (the two mutations are independent).
#[tokio::test]
async fn failed_rate_update_does_not_touch_cache() {
    let mut server = Server::new_async().await;
    let ctx = TestContext::new();

    server
        .mock("PUT", "/moneda/updateMoneda")
        .with_status(422)
        .with_body("rate out of range")
        .create_async()
        .await;
    let rounding_mock = server
        .mock("PUT", "/redondeo/updateRedondeo")
        .with_status(200)
        .create_async()
        .await;

    let request = CommitRequest {
        rate_value: "430".to_string(),
        cascade: Some(CascadeTarget::Cup),
    };
    let policy = RoundingPolicy {
        option: RoundingOption::Normal,
        credit_excess_to_bonus: false,
    };

    let outcome = dispatch::commit(&client_for(&server), &ctx, &request, Some(&policy)).await;

    assert_eq!(
        outcome.rate,
        Err(WorkflowError::Http {
            status: 422,
            message: "rate out of range".to_string(),
        })
    );
    assert_eq!(outcome.rounding, Some(Ok(())));
    assert_eq!(RateCache::load(&ctx).unwrap(), None);
    rounding_mock.assert_async().await;
}

/// The wire value is percent-encoded; the CUP direction uses its own
/// `tipo` discriminator.
#[tokio::test]
async fn wire_value_is_percent_encoded() {
    let mut server = Server::new_async().await;

    let put_mock = server
        .mock("PUT", "/moneda/updateMoneda")
        .match_body(Matcher::Json(json!({
            "value": "24%2C5",
            "config": { "isCambioCostosProductos": true, "tipo": "cambiar cup" }
        })))
        .with_status(200)
        .create_async()
        .await;

    client_for(&server)
        .update_rate("24,5", Some(CascadeTarget::Cup))
        .await
        .unwrap();
    put_mock.assert_async().await;
}

/// An unreachable host surfaces as a transport-level failure.
#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    // Reserved-port address nothing listens on.
    let client = ApiClient::new("http://127.0.0.1:1", None, true).unwrap();
    let err = client.update_rate("430", None).await.unwrap_err();
    assert!(matches!(err, WorkflowError::Network(_)), "{:?}", err);
}
