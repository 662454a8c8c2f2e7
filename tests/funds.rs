// tests/funds.rs
// Consolidation and gas distribution over the mock chain.

mod util;

use bridge_cycler::blockchain::chains::{ARBITRUM, BASE, LINEA, OPTIMISM};
use bridge_cycler::core::domain::TokenSymbol;
use bridge_cycler::core::errors::BotError;
use bridge_cycler::core::wallet_store::WalletStore;
use bridge_cycler::tools::{consolidate, distribute, TransferStatus};
use ethers::types::{Address, U256};
use pretty_assertions::assert_eq;
use util::{eth, usdc, Harness, ADDRESS, KEY, KEY_2};

fn two_wallets() -> WalletStore {
    let second = util::wallet_from(KEY_2).address;
    WalletStore::from_json(&format!(
        r#"[
            {{ "address": "{}", "private_key": "{}" }},
            {{ "address": "{:?}", "private_key": "{}" }}
        ]"#,
        ADDRESS, KEY, second, KEY_2
    ))
    .unwrap()
}

#[tokio::test]
async fn consolidate_sweeps_tracked_tokens_to_target() {
    let h = Harness::new();
    let store = two_wallets();
    let a = util::wallet();
    let b = util::wallet_from(KEY_2);
    let target = Address::repeat_byte(0x77);
    let usdc_base = h.token(BASE, TokenSymbol::Usdc);
    let weth_arb = h.token(ARBITRUM, TokenSymbol::Weth);
    h.chain.set_token(BASE, usdc_base, a.address, usdc(7));
    h.chain.set_token(ARBITRUM, weth_arb, b.address, eth(3));

    let active = store.require_active().unwrap();
    let records = consolidate(&h.services.executor(), &h.registry, &active, target, None).await.unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.is_sent()));
    assert_eq!(h.chain.token(BASE, usdc_base, target), usdc(7));
    assert_eq!(h.chain.token(ARBITRUM, weth_arb, target), eth(3));
    assert!(h.chain.token(BASE, usdc_base, a.address).is_zero());
}

#[tokio::test]
async fn consolidate_can_target_one_chain() {
    let h = Harness::new();
    let store = two_wallets();
    let a = util::wallet();
    let target = Address::repeat_byte(0x77);
    h.chain.set_token(BASE, h.token(BASE, TokenSymbol::Usdc), a.address, usdc(7));
    h.chain.set_token(LINEA, h.token(LINEA, TokenSymbol::Usdc), a.address, usdc(2));

    let active = store.require_active().unwrap();
    let records =
        consolidate(&h.services.executor(), &h.registry, &active, target, Some(LINEA)).await.unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!((records[0].chain_id, records[0].amount), (LINEA, usdc(2)));
    assert_eq!(h.chain.sent_on(BASE).len(), 0);
}

#[tokio::test]
async fn consolidate_skips_the_target_wallet_itself() {
    let h = Harness::new();
    let store = two_wallets();
    let a = util::wallet();
    h.chain.set_token(OPTIMISM, h.token(OPTIMISM, TokenSymbol::Weth), a.address, eth(5));

    let active = store.require_active().unwrap();
    let records = consolidate(&h.services.executor(), &h.registry, &active, a.address, None).await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn consolidate_records_failures_and_continues() {
    let h = Harness::new();
    let store = two_wallets();
    let a = util::wallet();
    let target = Address::repeat_byte(0x77);
    h.chain.set_token(BASE, h.token(BASE, TokenSymbol::Usdc), a.address, usdc(7));
    h.chain.set_token(LINEA, h.token(LINEA, TokenSymbol::Usdc), a.address, usdc(1));
    h.chain.set_gas_price(BASE, U256::from(10u64).pow(U256::from(12u64)));
    h.chain.fail_chain(OPTIMISM);

    let active = store.require_active().unwrap();
    let records = consolidate(&h.services.executor(), &h.registry, &active, target, None).await.unwrap();

    let base = records.iter().find(|r| r.chain_id == BASE).unwrap();
    assert!(matches!(&base.status, TransferStatus::Failed(m) if m.contains("Gas price")));
    assert!(records.iter().any(|r| r.chain_id == OPTIMISM && !r.is_sent()));
    assert!(records.iter().any(|r| r.chain_id == LINEA && r.is_sent()));
}

#[tokio::test]
async fn consolidate_rejects_unknown_chain() {
    let h = Harness::new();
    let store = two_wallets();
    let active = store.require_active().unwrap();
    let err = consolidate(&h.services.executor(), &h.registry, &active, Address::zero(), Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, BotError::UnknownChain(1)));
}

#[tokio::test]
async fn distribute_tops_up_short_wallets() {
    let h = Harness::new();
    let store = two_wallets();
    let a = util::wallet();
    let b = util::wallet_from(KEY_2);
    h.chain.set_native(BASE, a.address, eth(10));
    h.chain.set_native(BASE, b.address, eth(1));

    let records = distribute(&h.services.executor(), &h.registry, &store, 0, BASE, eth(2)).await.unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].is_sent());
    assert_eq!(records[0].symbol, TokenSymbol::Eth);
    assert_eq!(h.chain.native(BASE, b.address), eth(3));
    assert_eq!(h.chain.native(BASE, a.address), eth(8));
}

#[tokio::test]
async fn distribute_skips_wallets_already_funded() {
    let h = Harness::new();
    let store = two_wallets();
    let b = util::wallet_from(KEY_2);
    h.chain.set_native(BASE, util::address(), eth(10));
    h.chain.set_native(BASE, b.address, eth(2));

    let records = distribute(&h.services.executor(), &h.registry, &store, 0, BASE, eth(2)).await.unwrap();
    assert!(matches!(records[0].status, TransferStatus::Skipped(_)));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn distribute_stops_when_source_runs_dry() {
    let h = Harness::new();
    let store = two_wallets();
    h.chain.set_native(BASE, util::address(), eth(1));

    let records = distribute(&h.services.executor(), &h.registry, &store, 0, BASE, eth(2)).await.unwrap();
    assert!(matches!(&records[0].status, TransferStatus::Failed(m) if m.contains("source holds only")));
    assert!(h.chain.sent().is_empty());
}

#[tokio::test]
async fn distribute_rejects_missing_source_index() {
    let h = Harness::new();
    let store = two_wallets();
    let err = distribute(&h.services.executor(), &h.registry, &store, 5, BASE, eth(1)).await.unwrap_err();
    assert!(matches!(err, BotError::Validation(_)));
}
