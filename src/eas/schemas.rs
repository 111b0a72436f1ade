// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Smart Layer Network

//! Known EAS deployments and schema definitions.
//!
//! The schema registry is static: every schema this service accepts is baked
//! in per chain, keyed by the schema uid assigned by the on-chain
//! SchemaRegistry at registration time. Looking the definition up on chain is
//! deliberately avoided; an unknown schema uid is an upstream failure for the
//! save path.

use std::str::FromStr;

use alloy::primitives::Address;

/// A registered EAS schema: its on-chain uid and its field signature.
#[derive(Debug, Clone, Copy)]
pub struct SchemaDef {
    /// Schema uid as registered on chain.
    pub uid: &'static str,
    /// Ordered field signature, e.g. `"string idType, string id, ..."`.
    pub signature: &'static str,
}

/// EAS contract addresses and schemas for one chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainSchemas {
    pub chain_id: u64,
    /// EAS attestation contract (EIP-712 verifying contract for off-chain
    /// attestations).
    pub eas: &'static str,
    /// On-chain SchemaRegistry contract.
    pub schema_registry: &'static str,
    /// Identity attestation schema.
    pub id: SchemaDef,
    /// Marketplace selling-offer schema. Empty uid means the schema has not
    /// been registered on this chain yet.
    pub offer_for_selling: SchemaDef,
}

const ID_SIGNATURE: &str = "string idType, string id, address subject, string scriptURI";

const OFFER_SIGNATURE: &str = "address token, uint id, string receiverIdType, string receiver, \
     address erc20, uint price, bytes sellerSignature, string scriptURI";

/// Chains with a known EAS deployment and registered schemas.
pub const SUPPORTED_CHAINS: &[ChainSchemas] = &[
    // Sepolia
    ChainSchemas {
        chain_id: 11_155_111,
        eas: "0xC2679fBD37d54388Ce493F1DB75320D236e1815e",
        schema_registry: "0x0a7E2Ff54e76B8E6659aedc9103FB21c038050D0",
        id: SchemaDef {
            uid: "0x9775cfbff5ebe8ec1e54b36028b3c00e02603eaa3c2178cc0eb445f7a9c163d8",
            signature: ID_SIGNATURE,
        },
        offer_for_selling: SchemaDef {
            uid: "0x49e5d2bd5ca331e8fa2f986201d084564795bfea2b4ec8fe673cd3a8f86b88c1",
            signature: OFFER_SIGNATURE,
        },
    },
    // Polygon Mumbai
    ChainSchemas {
        chain_id: 80_001,
        eas: "0xaEF4103A04090071165F78D45D83A0C0782c2B2a",
        schema_registry: "0x55D26f9ae0203EF95494AE4C170eD35f4Cf77797",
        id: SchemaDef {
            uid: "0x71490cedeecc0ccba2895dda8bdbcfb1860e21d1a94a13a6a80b430bc1ac06f0",
            signature: ID_SIGNATURE,
        },
        offer_for_selling: SchemaDef {
            uid: "0x86968d1bb2ce38b5e5b501d3ff217d867c4609b101de1121a145962bfc4a4530",
            signature: OFFER_SIGNATURE,
        },
    },
    // Polygon mainnet (selling-offer schema not registered yet)
    ChainSchemas {
        chain_id: 137,
        eas: "0x5E634ef5355f45A855d02D66eCD687b1502AF790",
        schema_registry: "0x7876EEF51A891E737AF8ba5A5E0f0Fd29073D5a7",
        id: SchemaDef {
            uid: "0x79b84a21253707c939a9dde579dcc048c208a46170b184a8240cb205075ed01c",
            signature: ID_SIGNATURE,
        },
        offer_for_selling: SchemaDef {
            uid: "",
            signature: OFFER_SIGNATURE,
        },
    },
];

/// Schema lookup for a single chain.
#[derive(Debug, Clone, Copy)]
pub struct SchemaRegistry {
    chain: &'static ChainSchemas,
}

impl SchemaRegistry {
    /// Build a registry for the given chain, or `None` if this service has
    /// no EAS deployment configured for it.
    pub fn for_chain(chain_id: u64) -> Option<Self> {
        SUPPORTED_CHAINS
            .iter()
            .find(|c| c.chain_id == chain_id)
            .map(|chain| Self { chain })
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id
    }

    /// EIP-712 verifying contract for off-chain attestations on this chain.
    pub fn eas_contract(&self) -> Address {
        // Addresses in SUPPORTED_CHAINS are compile-time constants.
        Address::from_str(self.chain.eas).expect("valid EAS contract address constant")
    }

    pub fn id_schema(&self) -> &'static SchemaDef {
        &self.chain.id
    }

    pub fn offer_schema(&self) -> &'static SchemaDef {
        &self.chain.offer_for_selling
    }

    /// Field signature for a schema uid, if registered on this chain.
    pub fn signature_of(&self, uid: &str) -> Option<&'static str> {
        [&self.chain.id, &self.chain.offer_for_selling]
            .into_iter()
            .find(|def| !def.uid.is_empty() && def.uid.eq_ignore_ascii_case(uid))
            .map(|def| def.signature)
    }
}
