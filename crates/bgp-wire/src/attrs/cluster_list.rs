use std::fmt;
use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};
use nom::{IResult, Parser};
use nom::combinator::map;
use nom::number::complete::be_u32;

use crate::{AttrCode, AttrEmit, AttrFlags, ParseBe, many0_complete};

/// CLUSTER_LIST (RFC 4456).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ClusterList(pub Vec<Ipv4Addr>);

impl ParseBe<ClusterList> for ClusterList {
    fn parse_be(input: &[u8]) -> IResult<&[u8], ClusterList> {
        let (input, ids) = many0_complete(map(be_u32, Ipv4Addr::from)).parse(input)?;
        Ok((input, ClusterList(ids)))
    }
}

impl AttrEmit for ClusterList {
    fn attr_flags(&self) -> AttrFlags {
        AttrFlags::optional_non_transitive()
    }

    fn attr_code(&self) -> AttrCode {
        AttrCode::ClusterList
    }

    fn attr_len(&self) -> Option<usize> {
        Some(self.0.len() * 4)
    }

    fn emit_value(&self, buf: &mut BytesMut) {
        for id in self.0.iter() {
            buf.put(&id.octets()[..]);
        }
    }
}

impl fmt::Display for ClusterList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self
            .0
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<String>>()
            .join(" ");
        write!(f, "{v}")
    }
}
