//  Copyright 2022. The Corvus Developers
//
//  Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
//  following conditions are met:
//
//  1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
//  disclaimer.
//
//  2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
//  following disclaimer in the documentation and/or other materials provided with the distribution.
//
//  3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
//  products derived from this software without specific prior written permission.
//
//  THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
//  INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
//  DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
//  SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
//  SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
//  WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
//  USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! The block rulesets: context-free structural checks, then BIP-gated contextual checks against
//! the candidate's ancestry.

use crate::{
    blocks::{merkle::block_merkle_root, Block},
    consensus::{Bip, ConsensusConstants},
    transactions::Transaction,
    validation::{
        helpers::{
            block_sigops_cost,
            check_coinbase_height_commitment,
            check_witness_commitment,
            is_final_transaction,
            median_timestamp,
        },
        transaction_validator::validate_transaction,
        BlockError,
        BlockValidationContext,
    },
};

pub type StructuralBlockRuleFn = fn(&Block, &ConsensusConstants) -> Result<(), BlockError>;
pub type ContextualBlockRuleFn = fn(&BlockValidationContext<'_>) -> Result<(), BlockError>;

/// A contextual rule, optionally gated on a BIP activation height.
pub struct ContextualBlockRule {
    pub check: ContextualBlockRuleFn,
    pub activation: Option<Bip>,
}

/// Context-free block checks, in evaluation order.
pub const STRUCTURAL_BLOCK_RULESET: &[StructuralBlockRuleFn] = &[
    check_transaction_count,
    check_merkle_root,
    check_serialized_size,
    check_coinbase_position,
    check_transactions,
    check_sigop_count,
];

/// Contextual block checks, in evaluation order.
pub const CONTEXTUAL_BLOCK_RULESET: &[ContextualBlockRule] = &[
    ContextualBlockRule {
        check: check_transactions_final,
        activation: None,
    },
    ContextualBlockRule {
        check: check_coinbase_height,
        activation: Some(Bip::Bip34),
    },
    ContextualBlockRule {
        check: check_witness_commitment_rule,
        activation: Some(Bip::Bip141),
    },
    ContextualBlockRule {
        check: check_block_weight,
        activation: None,
    },
];

pub fn validate_block_structural(block: &Block, constants: &ConsensusConstants) -> Result<(), BlockError> {
    for rule in STRUCTURAL_BLOCK_RULESET {
        rule(block, constants)?;
    }
    Ok(())
}

pub fn validate_block_contextual(ctx: &BlockValidationContext<'_>) -> Result<(), BlockError> {
    for rule in CONTEXTUAL_BLOCK_RULESET {
        if let Some(bip) = rule.activation {
            if !ctx.constants.is_bip_enabled_at(bip, ctx.height) {
                continue;
            }
        }
        (rule.check)(ctx)?;
    }
    Ok(())
}

/// Runs the structural then the contextual ruleset.
pub fn validate_block(ctx: &BlockValidationContext<'_>) -> Result<(), BlockError> {
    validate_block_structural(ctx.block, ctx.constants)?;
    validate_block_contextual(ctx)
}

fn check_transaction_count(block: &Block, _constants: &ConsensusConstants) -> Result<(), BlockError> {
    if block.transactions.is_empty() {
        return Err(BlockError::BadTransactionCount);
    }
    Ok(())
}

fn check_merkle_root(block: &Block, _constants: &ConsensusConstants) -> Result<(), BlockError> {
    if block_merkle_root(&block.transactions) != block.header.merkle_root {
        return Err(BlockError::BadMerkleRoot);
    }
    Ok(())
}

fn check_serialized_size(block: &Block, constants: &ConsensusConstants) -> Result<(), BlockError> {
    if block.stripped_size() > constants.max_block_serialized_size() {
        return Err(BlockError::BadSize);
    }
    Ok(())
}

fn check_coinbase_position(block: &Block, _constants: &ConsensusConstants) -> Result<(), BlockError> {
    if block.coinbase().is_none() {
        return Err(BlockError::BadCoinBase);
    }
    if block.transactions.iter().skip(1).any(Transaction::is_coinbase) {
        return Err(BlockError::BadCoinBase);
    }
    Ok(())
}

fn check_transactions(block: &Block, constants: &ConsensusConstants) -> Result<(), BlockError> {
    for tx in &block.transactions {
        validate_transaction(tx, constants)?;
    }
    Ok(())
}

fn check_sigop_count(block: &Block, constants: &ConsensusConstants) -> Result<(), BlockError> {
    if block_sigops_cost(block) > constants.max_block_sigops_cost() {
        return Err(BlockError::BadSigOpCount);
    }
    Ok(())
}

fn check_transactions_final(ctx: &BlockValidationContext<'_>) -> Result<(), BlockError> {
    let timestamps = ctx.ancestry.last_n_timestamps(ctx.constants.median_timestamp_count());
    let median_time_past = median_timestamp(&timestamps);
    for tx in &ctx.block.transactions {
        if !is_final_transaction(tx, ctx.height, median_time_past) {
            return Err(BlockError::NonFinalTransaction);
        }
    }
    Ok(())
}

fn check_coinbase_height(ctx: &BlockValidationContext<'_>) -> Result<(), BlockError> {
    check_coinbase_height_commitment(ctx.block, ctx.height)
}

fn check_witness_commitment_rule(ctx: &BlockValidationContext<'_>) -> Result<(), BlockError> {
    check_witness_commitment(ctx.block)
}

fn check_block_weight(ctx: &BlockValidationContext<'_>) -> Result<(), BlockError> {
    if ctx.block.weight() > ctx.constants.max_block_weight() {
        return Err(BlockError::BadBlockWeight);
    }
    Ok(())
}
