use std::fmt;

use bytes::{BufMut, BytesMut};
use nom::number::complete::be_u16;

use crate::{
    Attrs, BGP_HEADER_LEN, Family, Header, MessageType, MpReach, MpUnreach, Negotiated,
    NotifyError, PrefixNlri, header_error, parse_prefix_run, patch_length, update_error,
};

/// One UPDATE. Plain IPv4 unicast travels in the top-level withdraw /
/// announce runs; every other family rides in MP_REACH / MP_UNREACH.
#[derive(Debug, Default)]
pub struct Update {
    pub withdraw: Vec<PrefixNlri>,
    pub attrs: Option<Attrs>,
    pub announce: Vec<PrefixNlri>,
    pub mp_reach: Option<MpReach>,
    pub mp_unreach: Option<MpUnreach>,
}

impl Update {
    /// End-of-RIB detection (RFC 4724 §2): an empty UPDATE marks IPv4
    /// unicast; an UPDATE whose only content is an empty MP_UNREACH
    /// marks that family.
    pub fn eor(&self) -> Option<Family> {
        if !self.withdraw.is_empty() || !self.announce.is_empty() || self.mp_reach.is_some() {
            return None;
        }
        match &self.mp_unreach {
            None if self.attrs.is_none() => Some(Family::IPV4_UNICAST),
            Some(mp) if mp.is_eor() && self.attrs.is_none() => Some(mp.family),
            _ => None,
        }
    }

    /// Build the End-of-RIB marker for a family.
    pub fn eor_marker(family: Family) -> Update {
        let mut update = Update::default();
        if !family.is_ipv4_unicast() {
            update.mp_unreach = Some(MpUnreach::new(family));
        }
        update
    }

    pub fn decode(input: &[u8], negotiated: &Negotiated) -> Result<Update, NotifyError> {
        let total = input.len();
        if total < 23 {
            return Err(NotifyError::bad_length(total as u16));
        }
        let input = &input[BGP_HEADER_LEN as usize..];
        let add_path = negotiated.addpath_receive(&Family::IPV4_UNICAST);

        let (input, withdraw_len) =
            be_u16::<&[u8], nom::error::Error<&[u8]>>(input).map_err(NotifyError::from)?;
        let (input, withdraw) = parse_prefix_run(input, withdraw_len, add_path)
            .map_err(|_| NotifyError::update(update_error::INVALID_NETWORK_FIELD))?;

        let (input, attr_len) =
            be_u16::<&[u8], nom::error::Error<&[u8]>>(input).map_err(NotifyError::from)?;
        let (input, parsed) = crate::parse_update_attrs(input, attr_len as usize, negotiated)?;

        let (rest, announce) = parse_prefix_run(input, input.len() as u16, add_path)
            .map_err(|_| NotifyError::update(update_error::INVALID_NETWORK_FIELD))?;
        debug_assert!(rest.is_empty());

        Ok(Update {
            withdraw,
            attrs: parsed.attrs,
            announce,
            mp_reach: parsed.mp_reach,
            mp_unreach: parsed.mp_unreach,
        })
    }

    pub fn encode(&self, negotiated: &Negotiated) -> Result<BytesMut, NotifyError> {
        let mut buf = BytesMut::with_capacity(512);
        Header::new(MessageType::Update, BGP_HEADER_LEN).emit(&mut buf);

        // Withdrawn routes.
        let withdraw_len_pos = buf.len();
        buf.put_u16(0);
        for nlri in self.withdraw.iter() {
            nlri.emit(&mut buf);
        }
        let withdraw_len = (buf.len() - withdraw_len_pos - 2) as u16;
        buf[withdraw_len_pos..withdraw_len_pos + 2]
            .copy_from_slice(&withdraw_len.to_be_bytes());

        // Path attributes, MP last per RFC 4760 recommendation is not
        // required; ascending code order puts them after code 10.
        let attr_len_pos = buf.len();
        buf.put_u16(0);
        let mut attr_buf = BytesMut::new();
        if let Some(attrs) = &self.attrs {
            attrs.emit(&mut attr_buf, negotiated.as4);
        }
        if let Some(mp_reach) = &self.mp_reach {
            use crate::AttrEmit;
            mp_reach.attr_emit(&mut attr_buf);
        }
        if let Some(mp_unreach) = &self.mp_unreach {
            use crate::AttrEmit;
            mp_unreach.attr_emit(&mut attr_buf);
        }
        buf.put(&attr_buf[..]);
        let attr_len = (buf.len() - attr_len_pos - 2) as u16;
        buf[attr_len_pos..attr_len_pos + 2].copy_from_slice(&attr_len.to_be_bytes());

        // Announced routes.
        for nlri in self.announce.iter() {
            nlri.emit(&mut buf);
        }

        if buf.len() > negotiated.msg_size() {
            return Err(NotifyError::new(
                crate::NotifyCode::MessageHeaderError,
                header_error::BAD_MESSAGE_LENGTH,
                (buf.len() as u16).to_be_bytes().to_vec(),
            ));
        }
        patch_length(&mut buf);
        Ok(buf)
    }
}

impl fmt::Display for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(family) = self.eor() {
            return writeln!(f, "Update: EoR {}", family);
        }
        writeln!(f, "Update:")?;
        if let Some(attrs) = &self.attrs {
            write!(f, "{}", attrs)?;
        }
        if !self.announce.is_empty() {
            writeln!(f, " Announce:")?;
            for nlri in self.announce.iter() {
                writeln!(f, "  {}", nlri)?;
            }
        }
        if !self.withdraw.is_empty() {
            writeln!(f, " Withdraw:")?;
            for nlri in self.withdraw.iter() {
                writeln!(f, "  {}", nlri)?;
            }
        }
        if let Some(mp_reach) = &self.mp_reach {
            write!(f, "{}", mp_reach)?;
        }
        if let Some(mp_unreach) = &self.mp_unreach {
            write!(f, "{}", mp_unreach)?;
        }
        Ok(())
    }
}
