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

//! The closed consensus error taxonomies. Every ruleset failure is one of these variants; the
//! sync layer decides what to do with the peer that caused it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("The previous block hash does not match any known header")]
    ParentNotFound,
    #[error("The header hash does not satisfy its declared proof-of-work target")]
    InvalidProofOfWork,
    #[error("The declared difficulty target does not match the required retarget value")]
    BadDifficultyTransition,
    #[error("The header timestamp is not greater than the median time past")]
    TimestampTooEarly,
    #[error("The header timestamp is too far in the future")]
    TimestampTooLate,
    #[error("The header version has been retired at this height")]
    BadVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    #[error("The transaction has no inputs")]
    EmptyInputs,
    #[error("The transaction has no outputs")]
    EmptyOutputs,
    #[error("The transaction exceeds the maximum serialized size")]
    OversizedByteCount,
    #[error("An output value is negative")]
    NegativeOutputValue,
    #[error("An output value exceeds the monetary limit")]
    OversizedOutputValue,
    #[error("The sum of output values exceeds the monetary limit")]
    OversizedTotalOutputValues,
    #[error("Two inputs spend the same previous output")]
    DuplicatedInput,
    #[error("A non-coinbase input spends the null previous output")]
    NullPreviousOutput,
    #[error("The coinbase signature script size is out of range")]
    BadCoinBaseSignatureScriptSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("The block exceeds the maximum serialized size")]
    BadSize,
    #[error("The block has no transactions")]
    BadTransactionCount,
    #[error("The block does not have exactly one coinbase at index zero")]
    BadCoinBase,
    #[error("The coinbase signature script does not commit to the block height")]
    BadCoinBaseHeight,
    #[error("The merkle root does not commit to the block's transactions")]
    BadMerkleRoot,
    #[error("Invalid transaction: {0}")]
    BadTransaction(#[from] TransactionError),
    #[error("The block exceeds the signature-operation limit")]
    BadSigOpCount,
    #[error("The block contains a non-final transaction")]
    NonFinalTransaction,
    #[error("The coinbase witness nonce is malformed")]
    BadWitnessNonce,
    #[error("The witness commitment does not match the block's witness data")]
    BadWitnessMerkle,
    #[error("The block carries witness data without a witness commitment")]
    UnexpectedWitness,
    #[error("The block exceeds the maximum weight")]
    BadBlockWeight,
}
