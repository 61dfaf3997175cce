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

//! The ordered transaction ruleset.

use std::collections::HashSet;

use crate::{
    consensus::ConsensusConstants,
    transactions::Transaction,
    validation::TransactionError,
};

pub type TransactionRuleFn = fn(&Transaction, &ConsensusConstants) -> Result<(), TransactionError>;

/// The transaction ruleset, in evaluation order.
pub const TRANSACTION_RULESET: &[TransactionRuleFn] = &[
    check_has_inputs,
    check_has_outputs,
    check_serialized_size,
    check_output_values,
    check_no_duplicate_inputs,
    check_coinbase_script_size,
    check_no_null_previous_outputs,
];

/// Runs the full ruleset against one transaction.
pub fn validate_transaction(tx: &Transaction, constants: &ConsensusConstants) -> Result<(), TransactionError> {
    for rule in TRANSACTION_RULESET {
        rule(tx, constants)?;
    }
    Ok(())
}

fn check_has_inputs(tx: &Transaction, _constants: &ConsensusConstants) -> Result<(), TransactionError> {
    if tx.inputs.is_empty() {
        return Err(TransactionError::EmptyInputs);
    }
    Ok(())
}

fn check_has_outputs(tx: &Transaction, _constants: &ConsensusConstants) -> Result<(), TransactionError> {
    if tx.outputs.is_empty() {
        return Err(TransactionError::EmptyOutputs);
    }
    Ok(())
}

fn check_serialized_size(tx: &Transaction, constants: &ConsensusConstants) -> Result<(), TransactionError> {
    if tx.base_size() > constants.max_block_serialized_size() {
        return Err(TransactionError::OversizedByteCount);
    }
    Ok(())
}

fn check_output_values(tx: &Transaction, constants: &ConsensusConstants) -> Result<(), TransactionError> {
    let max_money = constants.max_money();
    let mut total: i64 = 0;
    for output in &tx.outputs {
        if output.value < 0 {
            return Err(TransactionError::NegativeOutputValue);
        }
        if output.value > max_money {
            return Err(TransactionError::OversizedOutputValue);
        }
        total = total
            .checked_add(output.value)
            .ok_or(TransactionError::OversizedTotalOutputValues)?;
        if total > max_money {
            return Err(TransactionError::OversizedTotalOutputValues);
        }
    }
    Ok(())
}

fn check_no_duplicate_inputs(tx: &Transaction, _constants: &ConsensusConstants) -> Result<(), TransactionError> {
    let mut seen = HashSet::with_capacity(tx.inputs.len());
    for input in &tx.inputs {
        if !seen.insert(input.prev_output) {
            return Err(TransactionError::DuplicatedInput);
        }
    }
    Ok(())
}

fn check_coinbase_script_size(tx: &Transaction, constants: &ConsensusConstants) -> Result<(), TransactionError> {
    if !tx.is_coinbase() {
        return Ok(());
    }
    let (min, max) = constants.coinbase_script_size_range();
    let len = tx.inputs[0].signature_script.len();
    if len < min || len > max {
        return Err(TransactionError::BadCoinBaseSignatureScriptSize);
    }
    Ok(())
}

fn check_no_null_previous_outputs(tx: &Transaction, _constants: &ConsensusConstants) -> Result<(), TransactionError> {
    if tx.is_coinbase() {
        return Ok(());
    }
    if tx.inputs.iter().any(|input| input.prev_output.is_null()) {
        return Err(TransactionError::NullPreviousOutput);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use corvus_common_types::BlockHash;

    use super::*;
    use crate::{
        consensus::Network,
        transactions::{OutPoint, TxInput, TxOutput},
    };

    fn constants() -> ConsensusConstants {
        ConsensusConstants::for_network(Network::MainNet)
    }

    fn input(tag: u8, index: u32) -> TxInput {
        TxInput {
            prev_output: OutPoint {
                hash: BlockHash::from([tag; 32]),
                index,
            },
            signature_script: Vec::new(),
            sequence: u32::MAX,
            witness: Vec::new(),
        }
    }

    fn output(value: i64) -> TxOutput {
        TxOutput {
            value,
            pubkey_script: vec![0x51],
        }
    }

    fn spend() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![input(1, 0)],
            outputs: vec![output(1000)],
            lock_time: 0,
        }
    }

    #[test]
    fn a_simple_spend_passes() {
        assert!(validate_transaction(&spend(), &constants()).is_ok());
    }

    #[test]
    fn empty_inputs_and_outputs_fail_in_order() {
        let mut tx = spend();
        tx.inputs.clear();
        tx.outputs.clear();
        // Inputs are checked before outputs.
        assert_eq!(validate_transaction(&tx, &constants()), Err(TransactionError::EmptyInputs));
        tx.inputs = vec![input(1, 0)];
        assert_eq!(validate_transaction(&tx, &constants()), Err(TransactionError::EmptyOutputs));
    }

    #[test]
    fn output_value_bounds_are_enforced() {
        let max_money = constants().max_money();
        let mut tx = spend();

        tx.outputs[0].value = -1;
        assert_eq!(
            validate_transaction(&tx, &constants()),
            Err(TransactionError::NegativeOutputValue)
        );

        tx.outputs[0].value = max_money + 1;
        assert_eq!(
            validate_transaction(&tx, &constants()),
            Err(TransactionError::OversizedOutputValue)
        );

        tx.outputs = vec![output(max_money), output(1)];
        assert_eq!(
            validate_transaction(&tx, &constants()),
            Err(TransactionError::OversizedTotalOutputValues)
        );
    }

    #[test]
    fn duplicate_inputs_are_rejected() {
        let mut tx = spend();
        tx.inputs = vec![input(1, 0), input(2, 0), input(1, 0)];
        assert_eq!(
            validate_transaction(&tx, &constants()),
            Err(TransactionError::DuplicatedInput)
        );
    }

    #[test]
    fn coinbase_script_size_bounds() {
        let mut coinbase = Transaction {
            version: 1,
            inputs: vec![TxInput {
                prev_output: OutPoint::null(),
                signature_script: vec![0x01, 0x02],
                sequence: u32::MAX,
                witness: Vec::new(),
            }],
            outputs: vec![output(50)],
            lock_time: 0,
        };
        assert!(validate_transaction(&coinbase, &constants()).is_ok());

        coinbase.inputs[0].signature_script = vec![0x01];
        assert_eq!(
            validate_transaction(&coinbase, &constants()),
            Err(TransactionError::BadCoinBaseSignatureScriptSize)
        );

        coinbase.inputs[0].signature_script = vec![0u8; 101];
        assert_eq!(
            validate_transaction(&coinbase, &constants()),
            Err(TransactionError::BadCoinBaseSignatureScriptSize)
        );
    }

    #[test]
    fn non_coinbase_may_not_spend_the_null_outpoint() {
        let mut tx = spend();
        tx.inputs.push(TxInput {
            prev_output: OutPoint::null(),
            signature_script: Vec::new(),
            sequence: u32::MAX,
            witness: Vec::new(),
        });
        assert_eq!(
            validate_transaction(&tx, &constants()),
            Err(TransactionError::NullPreviousOutput)
        );
    }
}
