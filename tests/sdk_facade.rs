mod common;

use alloy::primitives::U256;
use alloy::sol_types::SolValue;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::*;
use token_wallet_sdk::blockchain::validate_address;
use token_wallet_sdk::{ConfigError, SdkError, TokenSdk, TransactionStatus, ValidationError};

async fn sdk_with(transport: &Arc<MockTransport>, private_key: Option<&str>) -> TokenSdk {
    TokenSdk::with_transport(transport.clone(), test_config(private_key))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_missing_endpoint_is_a_config_error() {
    let mut config = test_config(None);
    config.rpc.endpoint = String::new();

    let result = TokenSdk::new(config).await;
    assert!(matches!(result, Err(SdkError::Config(ConfigError::MissingEndpoint))));
}

#[tokio::test]
async fn test_contract_settings_are_validated() {
    let transport = Arc::new(MockTransport::new());

    let mut config = test_config(None);
    config.contract.address = String::new();
    let result = TokenSdk::with_transport(transport.clone(), config).await;
    assert!(matches!(result, Err(SdkError::Config(ConfigError::MissingContractAddress))));

    let mut config = test_config(None);
    config.contract.address = "0x1234".to_string();
    let result = TokenSdk::with_transport(transport.clone(), config).await;
    assert!(matches!(result, Err(SdkError::Config(ConfigError::InvalidContractAddress(_)))));

    for abi in ["", "[]"] {
        let mut config = test_config(None);
        config.contract.abi = Some(abi.to_string());
        let result = TokenSdk::with_transport(transport.clone(), config).await;
        assert!(matches!(result, Err(SdkError::Config(ConfigError::MissingAbi))), "abi {:?}", abi);
    }

    let mut config = test_config(None);
    config.contract.abi = Some(r#"[{"type":"function","name":"approve","inputs":[]}]"#.to_string());
    let result = TokenSdk::with_transport(transport.clone(), config).await;
    assert!(matches!(result, Err(SdkError::Config(ConfigError::InvalidAbi(_)))));
}

#[tokio::test]
async fn test_invalid_private_key_is_rejected() {
    let transport = Arc::new(MockTransport::new());

    for key in ["0x1234", "not a key"] {
        let result = TokenSdk::with_transport(transport.clone(), test_config(Some(key))).await;
        assert!(
            matches!(result, Err(SdkError::Config(ConfigError::InvalidPrivateKey(_)))),
            "key {:?}",
            key
        );
    }
}

#[tokio::test]
async fn test_unreachable_node_fails_construction() {
    let transport = Arc::new(MockTransport::new());
    transport.disconnected.store(true, Ordering::SeqCst);

    let result = TokenSdk::with_transport(transport.clone(), test_config(Some(PRIVATE_KEY))).await;
    assert!(matches!(result, Err(SdkError::Config(ConfigError::Connection(_)))));
}

#[tokio::test]
async fn test_blank_private_key_means_anonymous() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, Some("  ")).await;
    assert!(sdk.is_anonymous());
}

#[tokio::test]
async fn test_anonymous_instance_rejects_own_address_operations() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, None).await;
    assert!(sdk.is_anonymous());

    assert!(matches!(sdk.get_address(), Err(SdkError::NotConfigured(_))));
    assert!(matches!(sdk.get_ether_balance().await, Err(SdkError::NotConfigured(_))));
    assert!(matches!(sdk.get_token_balance().await, Err(SdkError::NotConfigured(_))));
    assert!(matches!(sdk.send_ether(RECIPIENT, "1").await, Err(SdkError::NotConfigured(_))));
    assert!(matches!(sdk.send_tokens(RECIPIENT, "1").await, Err(SdkError::NotConfigured(_))));
    assert_eq!(transport.call_count("eth_sendRawTransaction"), 0);
}

#[tokio::test]
async fn test_anonymous_instance_serves_read_only_queries() {
    let transport = Arc::new(MockTransport::new());
    transport
        .balances
        .lock()
        .unwrap()
        .insert(validate_address(RECIPIENT).unwrap(), U256::from(1_500_000_000_000_000_000u64));
    let sdk = sdk_with(&transport, None).await;

    assert_eq!(sdk.get_address_ether_balance(RECIPIENT).await.unwrap(), "1.5");
    assert_eq!(sdk.get_address_token_balance(RECIPIENT).await.unwrap(), "0");
    assert_eq!(
        sdk.get_transaction_status(&tx_hash(9)).await.unwrap(),
        TransactionStatus::Unknown
    );
}

#[tokio::test]
async fn test_get_address_is_checksummed() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, Some(PRIVATE_KEY)).await;

    assert!(!sdk.is_anonymous());
    assert_eq!(sdk.get_address().unwrap(), SENDER);
}

#[tokio::test]
async fn test_balances_are_formatted_in_whole_units() {
    let transport = Arc::new(MockTransport::new());
    transport
        .balances
        .lock()
        .unwrap()
        .insert(validate_address(SENDER).unwrap(), U256::from(2_000_000_000_000_000_000u64));
    let ten_tokens = U256::from(10u64) * U256::from(10u64).pow(U256::from(18u64));
    *transport.call_result.lock().unwrap() = ten_tokens.abi_encode();

    let sdk = sdk_with(&transport, Some(PRIVATE_KEY)).await;

    assert_eq!(sdk.get_ether_balance().await.unwrap(), "2");
    assert_eq!(sdk.get_token_balance().await.unwrap(), "10");
    assert_eq!(transport.call_count("eth_call"), 1);
}

#[tokio::test]
async fn test_malformed_address_fails_before_any_node_call() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, Some(PRIVATE_KEY)).await;
    let before = transport.total_calls();

    for address in [
        "5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAe",
        "0x5AAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
        "0xzzzz6053F3E94C9b9A09f33669435E7Ef1BeAed",
    ] {
        assert!(matches!(
            sdk.get_address_ether_balance(address).await,
            Err(SdkError::Validation(ValidationError::InvalidAddress(_)))
        ));
        assert!(matches!(
            sdk.get_address_token_balance(address).await,
            Err(SdkError::Validation(ValidationError::InvalidAddress(_)))
        ));
        assert!(matches!(
            sdk.send_ether(address, "1").await,
            Err(SdkError::Validation(ValidationError::InvalidAddress(_)))
        ));
        assert!(matches!(
            sdk.send_tokens(address, "1").await,
            Err(SdkError::Validation(ValidationError::InvalidAddress(_)))
        ));
    }

    assert_eq!(transport.total_calls(), before);
}

#[tokio::test]
async fn test_non_positive_amount_fails_before_nonce_lookup() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, Some(PRIVATE_KEY)).await;

    for amount in ["0", "-1", "0.0"] {
        assert!(matches!(
            sdk.send_ether(RECIPIENT, amount).await,
            Err(SdkError::Validation(ValidationError::NonPositiveAmount(_)))
        ));
        assert!(matches!(
            sdk.send_tokens(RECIPIENT, amount).await,
            Err(SdkError::Validation(ValidationError::NonPositiveAmount(_)))
        ));
    }
    assert!(matches!(
        sdk.send_ether(RECIPIENT, "abc").await,
        Err(SdkError::Validation(ValidationError::InvalidAmount(_)))
    ));

    assert_eq!(transport.call_count("eth_getTransactionCount"), 0);
}

#[tokio::test]
async fn test_amounts_finer_than_the_unit_are_rejected() {
    let transport = Arc::new(MockTransport::new());
    let mut config = test_config(Some(PRIVATE_KEY));
    config.contract.decimals = 0;
    let sdk = TokenSdk::with_transport(transport.clone(), config).await.unwrap();

    assert!(matches!(
        sdk.send_ether(RECIPIENT, "1.0000000000000000009").await,
        Err(SdkError::Validation(ValidationError::InvalidAmount(_)))
    ));
    assert!(matches!(
        sdk.send_tokens(RECIPIENT, "1.5").await,
        Err(SdkError::Validation(ValidationError::InvalidAmount(_)))
    ));

    assert_eq!(transport.call_count("eth_getTransactionCount"), 0);
    assert_eq!(transport.call_count("eth_sendRawTransaction"), 0);
}

#[tokio::test]
async fn test_malformed_transaction_hash_is_rejected() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, None).await;

    assert!(matches!(
        sdk.get_transaction_status("0x1234").await,
        Err(SdkError::Validation(ValidationError::InvalidTransactionHash(_)))
    ));
    assert_eq!(transport.call_count("eth_getTransactionByHash"), 0);
}

#[tokio::test]
async fn test_monitoring_requires_a_filter_bound() {
    let transport = Arc::new(MockTransport::new());
    let sdk = sdk_with(&transport, None).await;

    let result = sdk.monitor_ether_transactions(|_| {}, None, None).await;
    assert!(matches!(
        result,
        Err(SdkError::Validation(ValidationError::MissingFilterBounds))
    ));
    let result = sdk.monitor_token_transactions(|_| {}, Some(""), None).await;
    assert!(matches!(
        result,
        Err(SdkError::Validation(ValidationError::MissingFilterBounds))
    ));
    assert!(!sdk.is_monitoring().await);
}
