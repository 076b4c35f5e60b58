mod common;

use anyhow::Result;
use futures::future::join_all;
use std::sync::Arc;

use common::*;
use reward_reconciler::models::chain::{ContractCall, Nonce, TxSettings};
use reward_reconciler::models::withdrawal::WithdrawalOutcome;
use reward_reconciler::models::{Gwei, MerkleLeaf, ValidatorRange};
use reward_reconciler::services::{ReconcileMode, ReconciliationService, SubmissionQueue};
use reward_reconciler::utils::errors::{ChainError, ReconcilerError};
use reward_reconciler::MerkleTree;

struct Harness {
    chain: Arc<InMemoryChain>,
    commitments: Arc<InMemoryCommitments>,
    service: ReconciliationService,
}

fn harness(chain: InMemoryChain) -> Harness {
    let chain = Arc::new(chain);
    let commitments = Arc::new(InMemoryCommitments::default());
    let service = ReconciliationService::new(
        test_config(),
        Arc::new(InMemoryLedger::new(three_group_ledger())),
        chain.clone(),
        chain.clone(),
        commitments.clone(),
    );
    Harness {
        chain,
        commitments,
        service,
    }
}

fn withdrawn_amounts(chain: &InMemoryChain) -> Vec<Gwei> {
    chain
        .landed()
        .into_iter()
        .filter(|l| !l.reverted)
        .filter_map(|l| match l.call {
            ContractCall::Withdraw { amount, .. } => Some(amount),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_full_cycle_publishes_and_withdraws_every_group() -> Result<()> {
    let h = harness(three_group_chain());

    let summary = h.service.run(ReconcileMode::Full).await?;

    let expected = MerkleTree::build(vec![
        MerkleLeaf::new(0, 100, Gwei(1000)),
        MerkleLeaf::new(1, 50, Gwei(550)),
        MerkleLeaf::new(2, 20, Gwei(200)),
    ])?;
    assert_eq!(summary.root, expected.root());
    assert_eq!(summary.leaves, 3);
    assert_eq!(h.chain.root(ORACLE), Some(expected.root()));

    let report = summary.report.expect("published");
    assert!(report.tx_hash.is_some());

    let withdrawals = summary.withdrawals.expect("withdrawal pass ran");
    assert_eq!(withdrawals.withdrawn(), 3);
    assert_eq!(withdrawals.total_withdrawn(), Gwei(1750));
    assert_eq!(withdrawn_amounts(&h.chain), vec![Gwei(1000), Gwei(550), Gwei(200)]);

    // report first, then one withdrawal per distributor, each on the next nonce
    assert_eq!(h.chain.nonces(), vec![7, 8, 9, 10]);
    assert!(matches!(h.chain.landed()[0].call, ContractCall::Report { .. }));

    let dump = h.commitments.stored().expect("dump persisted");
    assert_eq!(MerkleTree::load(&dump)?.root(), summary.root);

    Ok(())
}

#[tokio::test]
async fn test_second_run_is_a_no_op() -> Result<()> {
    let h = harness(three_group_chain());
    h.service.run(ReconcileMode::Full).await?;
    let landed = h.chain.landed().len();

    let summary = h.service.run(ReconcileMode::Full).await?;

    assert_eq!(h.chain.landed().len(), landed);
    assert_eq!(summary.report.expect("report").tx_hash, None);
    let withdrawals = summary.withdrawals.expect("withdrawal pass ran");
    assert_eq!(withdrawals.withdrawn(), 0);
    assert_eq!(withdrawals.skipped(), 3);

    Ok(())
}

#[tokio::test]
async fn test_report_only_leaves_chain_untouched() -> Result<()> {
    let h = harness(three_group_chain());

    let summary = h.service.run(ReconcileMode::ReportOnly).await?;

    assert!(summary.report.is_none());
    assert!(summary.withdrawals.is_none());
    assert!(h.chain.landed().is_empty());
    assert_eq!(h.chain.root(ORACLE), None);
    assert!(h.commitments.stored().is_some());

    Ok(())
}

#[tokio::test]
async fn test_withdraw_from_persisted_artifact() -> Result<()> {
    let h = harness(three_group_chain());
    let summary = h.service.run(ReconcileMode::ReportOnly).await?;
    h.chain.set_root(ORACLE, summary.root);

    let report = h.service.withdraw_from_artifact().await?;

    assert_eq!(report.withdrawn(), 3);
    assert_eq!(h.chain.nonces(), vec![7, 8, 9]);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_from_artifact_publishes_unpublished_root() -> Result<()> {
    let h = harness(three_group_chain());
    let summary = h.service.run(ReconcileMode::ReportOnly).await?;
    assert_eq!(h.chain.root(ORACLE), None);

    let report = h.service.withdraw_from_artifact().await?;

    assert_eq!(h.chain.root(ORACLE), Some(summary.root));
    assert_eq!(report.withdrawn(), 3);
    assert_eq!(report.failed(), 0);
    let landed = h.chain.landed();
    assert!(matches!(landed[0].call, ContractCall::Report { root, .. } if root == summary.root));
    assert!(landed.iter().all(|l| !l.reverted));
    assert_eq!(h.chain.nonces(), vec![7, 8, 9, 10]);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_from_artifact_stops_when_publish_fails() -> Result<()> {
    let h = harness(three_group_chain());
    h.service.run(ReconcileMode::ReportOnly).await?;
    h.chain.fail_next(ORACLE, Fault::Reject);

    let result = h.service.withdraw_from_artifact().await;

    assert!(matches!(result, Err(ReconcilerError::Chain(ChainError::Rejected(_)))));
    assert!(h.chain.landed().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_distributor_on_stale_root_fails_alone() -> Result<()> {
    let stale_oracle = address(0x5e);
    let chain = three_group_chain();
    chain.add_distributor(ChainDistributor {
        address: address(0xa3),
        created_at_block: 23,
        group_id: 3,
        range: ValidatorRange::new(170, 10),
        legacy_wei: gwei_to_wei(30),
        balance_wei: gwei_to_wei(1),
        oracle: stale_oracle,
    });
    chain.set_root(stale_oracle, sp_core::H256::repeat_byte(9));
    let h = harness(chain);

    let withdrawals = h.service.run(ReconcileMode::Full).await?.withdrawals.expect("ran");

    assert_eq!(withdrawals.withdrawn(), 3);
    assert_eq!(withdrawals.failed(), 1);
    assert!(matches!(
        &withdrawals.outcomes[3],
        WithdrawalOutcome::Failed { distributor, .. } if *distributor == address(0xa3)
    ));
    assert_eq!(withdrawals.total_withdrawn(), Gwei(1750));
    // the reverted withdrawal still spent a nonce
    assert_eq!(h.chain.nonces(), vec![7, 8, 9, 10, 11]);
    assert!(h.chain.landed()[4].reverted);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_without_artifact_fails() {
    let h = harness(three_group_chain());

    let result = h.service.withdraw_from_artifact().await;

    assert!(matches!(result, Err(ReconcilerError::CommitmentStore(_))));
    assert!(h.chain.landed().is_empty());
}

#[tokio::test]
async fn test_revert_is_isolated_and_consumes_nonce() -> Result<()> {
    let h = harness(three_group_chain());
    h.chain.fail_next(address(0xa1), Fault::Revert);

    let withdrawals = h.service.run(ReconcileMode::Full).await?.withdrawals.expect("ran");

    assert_eq!(withdrawals.withdrawn(), 2);
    assert_eq!(withdrawals.failed(), 1);
    assert!(matches!(
        &withdrawals.outcomes[1],
        WithdrawalOutcome::Failed { distributor, .. } if *distributor == address(0xa1)
    ));
    assert_eq!(h.chain.nonces(), vec![7, 8, 9, 10]);
    assert_eq!(withdrawn_amounts(&h.chain), vec![Gwei(1000), Gwei(200)]);

    Ok(())
}

#[tokio::test]
async fn test_rejection_does_not_consume_nonce() -> Result<()> {
    let h = harness(three_group_chain());
    h.chain.fail_next(address(0xa1), Fault::Reject);

    let withdrawals = h.service.run(ReconcileMode::Full).await?.withdrawals.expect("ran");

    assert_eq!(withdrawals.withdrawn(), 2);
    assert_eq!(withdrawals.failed(), 1);
    // the rejected withdrawal's nonce is reused by the next one
    assert_eq!(h.chain.nonces(), vec![7, 8, 9]);

    // a later run picks up the distributor that failed
    let retry = h.service.run(ReconcileMode::Full).await?.withdrawals.expect("ran");
    assert_eq!(retry.withdrawn(), 1);
    assert_eq!(retry.skipped(), 2);
    assert_eq!(h.chain.nonces(), vec![7, 8, 9, 10]);

    Ok(())
}

#[tokio::test]
async fn test_transport_failure_resyncs_nonce() -> Result<()> {
    let h = harness(three_group_chain());
    h.chain.fail_next(address(0xa0), Fault::TransportLanded);

    let withdrawals = h.service.run(ReconcileMode::Full).await?.withdrawals.expect("ran");

    // the first withdrawal landed even though its receipt was lost
    assert_eq!(withdrawals.failed(), 1);
    assert_eq!(withdrawals.withdrawn(), 2);
    assert_eq!(h.chain.nonces(), vec![7, 8, 9, 10]);

    Ok(())
}

#[tokio::test]
async fn test_publish_failure_aborts_before_withdrawals() {
    let h = harness(three_group_chain());
    h.chain.fail_next(ORACLE, Fault::Revert);

    let result = h.service.run(ReconcileMode::Full).await;

    assert!(matches!(
        result,
        Err(ReconcilerError::Chain(ChainError::Reverted { .. }))
    ));
    assert_eq!(withdrawn_amounts(&h.chain), Vec::<Gwei>::new());
    assert!(h.commitments.stored().is_some());
}

#[tokio::test]
async fn test_overlapping_ranges_abort_before_anything_is_persisted() {
    let chain = three_group_chain();
    chain.add_distributor(ChainDistributor {
        address: address(0xa3),
        created_at_block: 22,
        group_id: 3,
        range: ValidatorRange::new(90, 20),
        legacy_wei: 0,
        balance_wei: 0,
        oracle: ORACLE,
    });
    let h = harness(chain);

    let result = h.service.run(ReconcileMode::Full).await;

    assert!(matches!(result, Err(ReconcilerError::OverlappingRanges(..))));
    assert!(h.commitments.stored().is_none());
    assert!(h.chain.landed().is_empty());
}

#[tokio::test]
async fn test_queue_recovers_from_outside_transaction() -> Result<()> {
    let chain = Arc::new(three_group_chain());
    let (handle, worker) = SubmissionQueue::new(
        chain.clone(),
        chain.clone(),
        OPERATOR,
        TxSettings { gas_limit: 200_000 },
    )
    .start()
    .await?;
    chain.send_external();

    let report = |byte| ContractCall::Report {
        oracle: ORACLE,
        root: sp_core::H256::repeat_byte(byte),
    };

    let first = handle.submit(report(1)).await;
    assert!(matches!(first, Err(ReconcilerError::Chain(ChainError::Rejected(_)))));

    let second = handle.submit(report(2)).await?;
    assert_eq!(second.nonce, 8);
    assert_eq!(chain.root(ORACLE), Some(sp_core::H256::repeat_byte(2)));

    drop(handle);
    assert_eq!(worker.await?, Nonce::from_transaction_count(9));

    Ok(())
}

#[tokio::test]
async fn test_concurrent_callers_get_distinct_nonces() -> Result<()> {
    let chain = Arc::new(three_group_chain());
    let queue = SubmissionQueue::new(
        chain.clone(),
        chain.clone(),
        OPERATOR,
        TxSettings { gas_limit: 200_000 },
    );
    let (handle, worker) = queue.start().await?;

    let submissions = (0..16u8).map(|i| {
        let handle = handle.clone();
        tokio::spawn(async move {
            handle
                .submit(ContractCall::Report {
                    oracle: ORACLE,
                    root: sp_core::H256::repeat_byte(i),
                })
                .await
        })
    });
    let receipts = join_all(submissions).await;
    drop(handle);

    let mut nonces: Vec<u64> = receipts
        .into_iter()
        .map(|r| r.expect("task").expect("confirmed").nonce)
        .collect();
    nonces.sort_unstable();
    assert_eq!(nonces, (7..23).collect::<Vec<_>>());
    assert_eq!(worker.await?, Nonce::from_transaction_count(23));

    Ok(())
}
