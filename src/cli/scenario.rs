use anyhow::Result;
use clap::{Args, Parser};

use migration_verifier::catalog::{
    chain_compatibility, erc20_transfer, fresh_address, DEFAULT_TRANSFER_AMOUNT,
};
use migration_verifier::{run_concurrently, VerifierConfig};
use migration_verifier_types::{Address, Bytes};

use super::{build_driver, emit};

#[derive(Parser, Debug)]
pub struct ChainCompatCmd {
    /// Deployed compatibility contract
    #[arg(long)]
    contract: Address,

    /// Account sending `mutate()`
    #[arg(long)]
    sender: Address,

    /// Pre-signed `mutate()` transaction; sent with eth_sendRawTransaction
    #[arg(long, value_name = "HEX")]
    signed_tx: Option<Bytes>,
}

impl ChainCompatCmd {
    pub async fn execute(&self, config: &VerifierConfig, json: bool) -> Result<()> {
        let driver = build_driver(config, self.signed_tx.is_some());
        let plan = chain_compatibility(self.contract, self.sender, self.signed_tx.clone());
        let report = driver.run(&plan).await;
        emit(&[report], json)
    }
}

/// Which storage slot holds the token's balance mapping.
#[derive(Args, Debug)]
pub struct BalanceSlotArgs {
    /// Declaration slot of the balance mapping (0 for the common layout)
    #[arg(long, default_value_t = 0)]
    balance_slot: u64,

    /// Skip the sender/recipient balance-slot checks
    #[arg(long)]
    skip_slot_check: bool,
}

impl BalanceSlotArgs {
    fn slot(&self) -> Option<u64> {
        (!self.skip_slot_check).then_some(self.balance_slot)
    }
}

#[derive(Parser, Debug)]
pub struct Erc20Cmd {
    /// Deployed ERC20 token
    #[arg(long)]
    token: Address,

    /// Token holder sending the transfer
    #[arg(long)]
    sender: Address,

    /// Recipient; a fresh address when omitted
    #[arg(long)]
    recipient: Option<Address>,

    #[arg(long, default_value_t = DEFAULT_TRANSFER_AMOUNT)]
    amount: u128,

    #[command(flatten)]
    slots: BalanceSlotArgs,

    /// Pre-signed transfer; requires --recipient to match its payload
    #[arg(long, value_name = "HEX", requires = "recipient")]
    signed_tx: Option<Bytes>,
}

impl Erc20Cmd {
    fn plan(&self) -> migration_verifier::ScenarioPlan {
        let recipient = self
            .recipient
            .unwrap_or_else(|| fresh_address(self.sender.as_bytes()));
        erc20_transfer(
            self.token,
            self.sender,
            recipient,
            self.amount,
            self.slots.slot(),
            self.signed_tx.clone(),
        )
    }

    pub async fn execute(&self, config: &VerifierConfig, json: bool) -> Result<()> {
        let driver = build_driver(config, self.signed_tx.is_some());
        let report = driver.run(&self.plan()).await;
        emit(&[report], json)
    }
}

#[derive(Parser, Debug)]
pub struct SuiteCmd {
    /// Deployed compatibility contract
    #[arg(long)]
    contract: Address,

    /// Deployed ERC20 token
    #[arg(long)]
    token: Address,

    /// Account sending both transactions (node-signed)
    #[arg(long)]
    sender: Address,

    #[command(flatten)]
    slots: BalanceSlotArgs,
}

impl SuiteCmd {
    pub async fn execute(&self, config: &VerifierConfig, json: bool) -> Result<()> {
        let recipient = fresh_address(self.token.as_bytes());
        let runs = vec![
            (
                build_driver(config, false),
                chain_compatibility(self.contract, self.sender, None),
            ),
            (
                build_driver(config, false),
                erc20_transfer(
                    self.token,
                    self.sender,
                    recipient,
                    DEFAULT_TRANSFER_AMOUNT,
                    self.slots.slot(),
                    None,
                ),
            ),
        ];
        let reports = run_concurrently(&runs).await;
        emit(&reports, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "0xe7f1725e7734ce288f8367e1bb143e90bb3f0512";
    const SENDER: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    #[test]
    fn test_erc20_checks_slot_zero_by_default() {
        let cmd = Erc20Cmd::try_parse_from(["erc20", "--token", TOKEN, "--sender", SENDER]).unwrap();
        assert_eq!(cmd.slots.slot(), Some(0));
        assert_eq!(cmd.plan().watched_slots.len(), 2);
    }

    #[test]
    fn test_erc20_slot_check_can_be_moved_or_skipped() {
        let cmd = Erc20Cmd::try_parse_from([
            "erc20", "--token", TOKEN, "--sender", SENDER, "--balance-slot", "3",
        ])
        .unwrap();
        assert_eq!(cmd.slots.slot(), Some(3));

        let cmd = Erc20Cmd::try_parse_from([
            "erc20", "--token", TOKEN, "--sender", SENDER, "--skip-slot-check",
        ])
        .unwrap();
        assert_eq!(cmd.slots.slot(), None);
        assert!(cmd.plan().watched_slots.is_empty());
    }
}
