#![warn(missing_docs)]

//! Identifier space of the chord ring.
//!
//! A [Did] is an element of the finite ring Z/(2^160), wrapping a H160. Node identifiers are the SHA-1
//! digest of a node's advertised endpoint, key identifiers are the SHA-1 digest of the key string.
//!
//! Ring order is circular, so plain integer comparison is meaningless for "between" questions.
//! All range tests below are done on distances `x - low`, which turns the arc `(low, high]` into
//! the ordinary interval `(0, high - low]`.
//!
//! Since there is no total order on a cyclic group we introduce [BiasId], which fixes a reference
//! point as zero and orders every other Did by its clockwise distance from it.

use std::borrow::Borrow;
use std::cmp::PartialEq;
use std::ops::Add;
use std::ops::Deref;
use std::ops::Neg;
use std::ops::Sub;
use std::str::FromStr;

use ethereum_types::H160;
use num_bigint::BigUint;
use serde::Deserialize;
use serde::Serialize;
use sha1::Digest;
use sha1::Sha1;

use crate::error::Error;
use crate::error::Result;

/// Did is a finate Ring R(P) where P = 2^160, wrap H160.
#[derive(Copy, Clone, Eq, Ord, PartialEq, PartialOrd, Debug, Serialize, Deserialize, Hash)]
pub struct Did(H160);

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let inner = &self.0;
        write!(f, "0x{inner:x}")
    }
}

/// Bias Did is a special Did which set origin Did's identity to bias.
/// While two Dids `a` and `b` have no order on the ring, their distances to a reference Did `x` do,
/// so BiasId treats `x` as the zero point and compares by clockwise distance.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize, Hash)]
pub struct BiasId {
    /// the zero point for determine order of Did.
    bias: Did,
    /// did data without bias.
    did: Did,
}

impl BiasId {
    /// Wrap a Did into BiasDid with given bias.
    pub fn new(bias: Did, did: Did) -> BiasId {
        BiasId {
            bias,
            did: did - bias,
        }
    }

    /// Get wrapped biased value from did
    pub fn to_did(self) -> Did {
        self.did + self.bias
    }

    /// Get unwrap value from a BiasDid
    pub fn pos(&self) -> Did {
        self.did
    }
}

impl PartialOrd for BiasId {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<Did> for BiasId {
    fn eq(&self, rhs: &Did) -> bool {
        let id: Did = self.into();
        id == *rhs
    }
}

impl Ord for BiasId {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        if other.bias != self.bias {
            let did: Did = other.into();
            let bid = BiasId::new(self.bias, did);
            self.did.cmp(&bid.did)
        } else {
            self.did.cmp(&other.did)
        }
    }
}

impl From<BiasId> for Did {
    fn from(id: BiasId) -> Did {
        BiasId::to_did(id)
    }
}

impl From<&BiasId> for Did {
    fn from(id: &BiasId) -> Did {
        BiasId::to_did(*id)
    }
}

impl From<u32> for Did {
    fn from(id: u32) -> Did {
        Self::from(BigUint::from(id))
    }
}

impl Did {
    /// Identifier of arbitrary bytes, the full SHA-1 digest.
    pub fn hash(bytes: impl AsRef<[u8]>) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(bytes.as_ref());
        Self(H160::from_slice(&hasher.finalize()))
    }

    /// Identifier of a key string.
    pub fn from_key(key: &str) -> Self {
        Self::hash(key.as_bytes())
    }

    /// Zero of the ring.
    pub fn zero() -> Self {
        Self(H160::zero())
    }

    /// Test x <- (low, high]. When `low == high` the arc covers the whole ring.
    pub fn in_range(&self, low: Self, high: Self) -> bool {
        let span = high - low;
        if span == Self::zero() {
            return true;
        }
        let dist = *self - low;
        dist != Self::zero() && dist <= span
    }

    /// Test x <- (low, high). When `low == high` every id except `low` is between.
    pub fn between(&self, low: Self, high: Self) -> bool {
        let dist = *self - low;
        if dist == Self::zero() {
            return false;
        }
        let span = high - low;
        span == Self::zero() || dist < span
    }

    /// Start of the k-th finger, `self + 2^k`.
    pub fn finger_start(&self, k: u32) -> Self {
        *self + Did::from(BigUint::from(2u16).pow(k))
    }

    /// Next identifier on the ring, `self + 1`.
    pub fn next(&self) -> Self {
        *self + Did::from(1u32)
    }

    /// Transform Did to BiasDid
    pub fn bias(&self, did: Self) -> BiasId {
        BiasId::new(did, *self)
    }
}

/// Among `candidates`, pick the one with the largest id strictly between `local` and `target`.
/// A candidate equal to `target` (or to `local`) never qualifies. Returns `None` when nothing
/// qualifies and the caller should fall back to its successor.
pub fn closest_preceding<T, I>(local: Did, target: Did, candidates: I) -> Option<T>
where
    T: Borrow<Did>,
    I: IntoIterator<Item = T>,
{
    candidates
        .into_iter()
        .filter(|c| c.borrow().between(local, target))
        .max_by_key(|c| c.borrow().bias(local))
}

impl Deref for Did {
    type Target = H160;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Did> for H160 {
    fn from(a: Did) -> Self {
        a.0.to_owned()
    }
}

impl From<Did> for BigUint {
    fn from(did: Did) -> BigUint {
        BigUint::from_bytes_be(did.as_bytes())
    }
}

impl From<BigUint> for Did {
    fn from(a: BigUint) -> Self {
        let ff = a % (BigUint::from(2u16).pow(160));
        let va: Vec<u8> = ff.to_bytes_be();
        let mut res = [0u8; 20];
        res[20 - va.len()..].copy_from_slice(&va);
        Self(H160::from(res))
    }
}

impl From<H160> for Did {
    fn from(addr: H160) -> Self {
        Self(addr)
    }
}

impl FromStr for Did {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(Self(
            H160::from_str(s).map_err(|_| Error::InvalidArgument(format!("bad did {s}")))?,
        ))
    }
}

// impl Finate Ring For Did
impl Neg for Did {
    type Output = Self;
    fn neg(self) -> Self {
        let ret = BigUint::from(2u16).pow(160) - BigUint::from(self);
        ret.into()
    }
}

impl<'a> Neg for &'a Did {
    type Output = Did;

    fn neg(self) -> Self::Output {
        (*self).neg()
    }
}

impl Add for Did {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        ((BigUint::from(self) + BigUint::from(rhs)) % (BigUint::from(2u16).pow(160))).into()
    }
}

impl Sub for Did {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}
