//! Collateral deal scenarios: creation layout, settlement accounting,
//! the withdraw asymmetry around the finish time, and the four-pool split.

use lockpool::{Address, LedgerError, ProviderKind, MAX_RATIO};
use lockpool_integration_tests::*;

const FINISH: u64 = 1_000_000;
const NOW: u64 = 1_000;
const HALF_RATIO: u128 = MAX_RATIO / 2;

fn deal() -> (lockpool::Ledger, lockpool::CollateralPoolIds) {
    let mut ledger = ledger();
    let ids = ledger
        .create_collateral_pool(
            owner(),
            main_coin(),
            token(),
            TOKEN_AMOUNT,
            MAIN_COIN_AMOUNT,
            FINISH,
            b"signature",
            NOW,
        )
        .unwrap();
    (ledger, ids)
}

#[test]
fn creation_registers_four_contiguous_pools() {
    let (ledger, ids) = deal();
    assert_eq!(ledger.total_supply(), 4);
    assert_eq!(ids.main_coin_collector, ids.collateral + 1);
    assert_eq!(ids.token_collector, ids.collateral + 2);
    assert_eq!(ids.main_coin_holder, ids.collateral + 3);

    let data = ledger.data(ids.collateral).unwrap();
    assert_eq!(data.provider, ProviderKind::Collateral);
    assert_eq!(data.name, "CollateralProvider");
    assert_eq!(data.owner, owner());
    assert_eq!(data.token, main_coin());
    assert_eq!(
        data.params.as_slice(),
        &[MAIN_COIN_AMOUNT, FINISH as u128, HALF_RATIO]
    );

    // Delegates belong to the provider itself.
    let provider_addr = ProviderKind::Collateral.address();
    for id in [ids.main_coin_collector, ids.token_collector, ids.main_coin_holder] {
        assert_eq!(ledger.owner_of(id).unwrap(), provider_addr);
    }
    // The token collector has no custody or asset until something is refunded.
    let token_collector = ledger.data(ids.token_collector).unwrap();
    assert_eq!(token_collector.vault_id, 0);
    assert_eq!(token_collector.token, Address::ZERO);
    // The pledge sits in one vault shared by collector and holder.
    let vault_id = ledger.data(ids.collateral).unwrap().vault_id;
    assert_eq!(ledger.vault_balance(vault_id), MAIN_COIN_AMOUNT);
}

#[test]
fn full_data_reports_the_family_in_creation_order() {
    let (ledger, ids) = deal();
    let family = ledger.full_data(ids.collateral).unwrap();
    assert_eq!(family.len(), 4);
    assert_eq!(family[0].pool_id, ids.collateral);
    assert_eq!(family[1].pool_id, ids.main_coin_collector);
    assert_eq!(family[2].pool_id, ids.token_collector);
    assert_eq!(family[3].pool_id, ids.main_coin_holder);
    assert_eq!(family[1].params.as_slice(), &[0]);
    assert_eq!(family[2].params.as_slice(), &[0]);
    assert_eq!(family[3].params.as_slice(), &[MAIN_COIN_AMOUNT]);
}

#[test]
fn creation_validates_inputs() {
    let mut ledger = ledger();
    let zero = Address::ZERO;
    assert_eq!(
        ledger
            .create_collateral_pool(zero, main_coin(), token(), 1, 1, FINISH, b"", NOW)
            .unwrap_err(),
        LedgerError::InvalidAddress
    );
    assert_eq!(
        ledger
            .create_collateral_pool(owner(), main_coin(), token(), 1, 1, NOW, b"", NOW)
            .unwrap_err(),
        LedgerError::InvalidSchedule
    );
    assert!(ledger
        .create_collateral_pool(owner(), main_coin(), token(), 0, 1, FINISH, b"", NOW)
        .is_err());
}

#[test]
fn token_sale_moves_main_coin_into_the_collector() {
    let (mut ledger, ids) = deal();
    let moved = ledger.handle_withdraw(ids.collateral, 100_000).unwrap();
    assert_eq!(moved, 50_000);
    assert_eq!(ledger.data(ids.main_coin_collector).unwrap().params[0], 50_000);
    assert_eq!(ledger.data(ids.main_coin_holder).unwrap().params[0], 50_000);
    // The deal total is unchanged; value only moved internally.
    assert_eq!(ledger.data(ids.collateral).unwrap().params[0], MAIN_COIN_AMOUNT);
}

#[test]
fn refund_credits_tokens_and_pays_the_payer() {
    let (mut ledger, ids) = deal();
    let paid = ledger.handle_refund(ids.collateral, other(), 100_000).unwrap();
    assert_eq!(paid, 50_000);
    assert_eq!(ledger.data(ids.token_collector).unwrap().params[0], 100_000);
    assert_eq!(ledger.data(ids.main_coin_holder).unwrap().params[0], 50_000);
    assert_eq!(ledger.data(ids.collateral).unwrap().params[0], 50_000);
    let transfer = ledger.transfers().last().unwrap();
    assert_eq!(transfer.recipient, other());
    assert_eq!(transfer.amount, 50_000);
}

#[test]
fn over_settlement_is_clamped() {
    let (mut ledger, ids) = deal();
    // The whole pledge backs 200_000 tokens; asking for more moves no more.
    ledger.handle_withdraw(ids.collateral, 500_000).unwrap();
    assert_eq!(ledger.data(ids.main_coin_holder).unwrap().params[0], 0);
    assert_eq!(
        ledger.data(ids.main_coin_collector).unwrap().params[0],
        MAIN_COIN_AMOUNT
    );
    assert_eq!(ledger.handle_withdraw(ids.collateral, 1).unwrap(), 0);
    assert_eq!(ledger.handle_refund(ids.collateral, other(), 1).unwrap(), 0);
}

#[test]
fn withdrawable_is_gated_on_the_finish_time() {
    let (mut ledger, ids) = deal();
    assert_eq!(ledger.withdrawable_amount(ids.collateral, NOW).unwrap(), 0);
    assert_eq!(
        ledger.withdrawable_amount(ids.collateral, FINISH).unwrap(),
        MAIN_COIN_AMOUNT
    );
    ledger.handle_withdraw(ids.collateral, 100_000).unwrap();
    // Settled main coin is available early; the reserve only at finish.
    assert_eq!(ledger.withdrawable_amount(ids.collateral, NOW).unwrap(), 50_000);
    assert_eq!(
        ledger.withdrawable_amount(ids.collateral, FINISH).unwrap(),
        MAIN_COIN_AMOUNT
    );
}

#[test]
fn withdraw_before_finish_leaves_the_holder_reserve() {
    let (mut ledger, ids) = deal();
    ledger.handle_withdraw(ids.collateral, 100_000).unwrap();
    let outcome = ledger
        .transfer_to_registry(owner(), ids.collateral, NOW + 1)
        .unwrap();
    assert_eq!(outcome.withdrawn, 50_000);
    assert!(!outcome.is_final);
    assert_eq!(ledger.data(ids.main_coin_collector).unwrap().params[0], 0);
    assert_eq!(ledger.data(ids.main_coin_holder).unwrap().params[0], 50_000);
    assert_eq!(ledger.data(ids.collateral).unwrap().params[0], 50_000);
}

#[test]
fn withdraw_at_finish_drains_everything_and_is_final() {
    let (mut ledger, ids) = deal();
    ledger.handle_withdraw(ids.collateral, 100_000).unwrap();
    let outcome = ledger
        .transfer_to_registry(owner(), ids.collateral, FINISH)
        .unwrap();
    assert_eq!(outcome.withdrawn, MAIN_COIN_AMOUNT);
    assert!(outcome.is_final);
    for id in [ids.collateral, ids.main_coin_collector, ids.main_coin_holder] {
        assert_eq!(ledger.data(id).unwrap().params[0], 0);
    }
    // The owner received the whole pledge.
    let to_owner: u128 = ledger
        .transfers()
        .iter()
        .filter(|t| t.recipient == owner())
        .map(|t| t.amount)
        .sum();
    assert_eq!(to_owner, MAIN_COIN_AMOUNT);
}

#[test]
fn withdraw_is_owner_only() {
    let (mut ledger, ids) = deal();
    assert_eq!(
        ledger
            .transfer_to_registry(other(), ids.collateral, FINISH)
            .unwrap_err(),
        LedgerError::UnauthorizedCaller(ids.collateral)
    );
}

#[test]
fn half_split_produces_a_second_four_pool_family() {
    let (mut ledger, ids) = deal();
    let split = ledger
        .transfer_to_registry_with_split(owner(), ids.collateral, HALF_RATIO, other())
        .unwrap();
    assert_eq!(split.pool_id, ids.collateral);
    assert_eq!(split.new_pool_id, ids.collateral + 4);
    assert_eq!(split.owner, owner());
    assert_eq!(split.new_owner, other());
    assert_eq!(split.split_left_amount, 50_000);
    assert_eq!(split.new_split_left_amount, 50_000);

    assert_eq!(ledger.total_supply(), 8);
    let new_family = ledger.full_data(split.new_pool_id).unwrap();
    assert_eq!(new_family[0].owner, other());
    assert_eq!(
        new_family[0].params.as_slice(),
        &[50_000, FINISH as u128, HALF_RATIO]
    );
    assert_eq!(new_family[3].params.as_slice(), &[50_000]);
    // The original family keeps the other half.
    assert_eq!(ledger.data(ids.collateral).unwrap().params[0], 50_000);
    assert_eq!(ledger.data(ids.main_coin_holder).unwrap().params[0], 50_000);
}

#[test]
fn split_after_uneven_settlement_reports_honest_amounts() {
    let (mut ledger, ids) = deal();
    // An odd collector balance makes the delegate floors disagree with the
    // primary floor; both sides must still withdraw exactly their primary.
    ledger.handle_withdraw(ids.collateral, 2).unwrap();
    let split = ledger
        .transfer_to_registry_with_split(owner(), ids.collateral, HALF_RATIO, other())
        .unwrap();
    assert_eq!(split.split_left_amount + split.new_split_left_amount, MAIN_COIN_AMOUNT);
    assert_eq!(
        ledger.withdrawable_amount(split.new_pool_id, FINISH).unwrap(),
        split.new_split_left_amount
    );
    assert_eq!(
        ledger.withdrawable_amount(ids.collateral, FINISH).unwrap(),
        split.split_left_amount
    );
}

#[test]
fn split_halves_settled_value_too() {
    let (mut ledger, ids) = deal();
    ledger.handle_withdraw(ids.collateral, 60_000).unwrap();
    ledger
        .transfer_to_registry_with_split(owner(), ids.collateral, HALF_RATIO, other())
        .unwrap();
    let new = lockpool::CollateralPoolIds::of(ids.collateral + 4);
    assert_eq!(ledger.data(ids.main_coin_collector).unwrap().params[0], 15_000);
    assert_eq!(ledger.data(new.main_coin_collector).unwrap().params[0], 15_000);
    assert_eq!(ledger.data(ids.main_coin_holder).unwrap().params[0], 35_000);
    assert_eq!(ledger.data(new.main_coin_holder).unwrap().params[0], 35_000);
    // Both families keep the internal total equal to their primary amount.
    assert_eq!(ledger.data(ids.collateral).unwrap().params[0], 50_000);
    assert_eq!(ledger.data(new.collateral).unwrap().params[0], 50_000);
}
