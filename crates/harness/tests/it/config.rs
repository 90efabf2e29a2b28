//! Backend selection from `FLOW_` environment variables

use flow_harness::{Harness, HarnessError, SetupError};
use flow_harness_primitives::Chain;
use flow_harness_wallets::utils::DEFAULT_SERVICE_PRIVATE_KEY;

#[test]
fn defaults_to_emulator() {
    figment::Jail::expect_with(|_| {
        let harness = Harness::from_env().unwrap();
        assert!(harness.backend.is_emulator());
        assert_eq!(harness.chain, Chain::Emulator);
        Ok(())
    });
}

#[test]
fn unknown_network_type_selects_emulator() {
    figment::Jail::expect_with(|jail| {
        for network_type in ["mainnet", "TESTNET", "1"] {
            jail.set_env("FLOW_NETWORK_TYPE", network_type);
            let harness = Harness::from_env().unwrap();
            assert!(harness.backend.is_emulator(), "{network_type}");
        }
        Ok(())
    });
}

#[test]
fn testnet_from_env() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("FLOW_NETWORK_TYPE", "testnet");
        jail.set_env("FLOW_ADDRESS", "127.0.0.1:8888");
        let key = format!("0x{DEFAULT_SERVICE_PRIVATE_KEY}");
        jail.set_env("FLOW_SERVICE_ACCOUNT_PRIVATE_KEY", key);
        jail.set_env("FLOW_POLL_INTERVAL_MS", "10");

        let harness = Harness::from_env().unwrap();
        assert_eq!(harness.chain, Chain::Testnet);
        let client = harness.backend.as_network().unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:8888/");
        Ok(())
    });
}

#[test]
fn testnet_without_key_is_fatal() {
    figment::Jail::expect_with(|jail| {
        jail.set_env("FLOW_NETWORK_TYPE", "testnet");
        jail.set_env("FLOW_ADDRESS", "127.0.0.1:8888");

        let err = Harness::from_env().unwrap_err();
        assert!(matches!(err, SetupError::MissingServiceKey(_)));
        assert!(HarnessError::from(err).is_fatal());
        Ok(())
    });
}

#[test]
fn emulator_with_custom_service_key() {
    figment::Jail::expect_with(|jail| {
        let key = "0x1111111111111111111111111111111111111111111111111111111111111111";
        jail.set_env("FLOW_SERVICE_ACCOUNT_PRIVATE_KEY", key);

        let harness = Harness::from_env().unwrap();
        let chain = harness.backend.as_emulator().unwrap();
        assert_eq!(chain.service_key().public_key, harness.service.signer.public_key());
        assert_eq!(harness.service.signer.to_bytes().to_string(), key);
        Ok(())
    });
}
