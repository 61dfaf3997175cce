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

//! Consensus validation: the closed error taxonomies, the ancestry views that rules read
//! through, and the header, transaction and block rulesets.

mod ancestry;
mod block_validator;
mod error;
pub mod helpers;
mod header_validator;
pub mod mocks;
mod transaction_validator;

pub use ancestry::{BlockValidationContext, HeaderAncestryView, HeaderValidationContext, TimechainAncestryView};
pub use block_validator::{
    validate_block,
    validate_block_contextual,
    validate_block_structural,
    ContextualBlockRule,
    ContextualBlockRuleFn,
    StructuralBlockRuleFn,
    CONTEXTUAL_BLOCK_RULESET,
    STRUCTURAL_BLOCK_RULESET,
};
pub use error::{BlockError, HeaderError, TransactionError};
pub use header_validator::{validate_header, HeaderRule, HeaderRuleFn, HEADER_RULESET};
pub use transaction_validator::{validate_transaction, TransactionRuleFn, TRANSACTION_RULESET};
