//! Assembly and delivery of Start, Interim-Update and Stop records

use crate::config::NasConfig;
use crate::error::{AcctError, TransportError};
use crate::session::AcctSession;
use crate::transport::AccountingTransport;
use radius_proto::{AcctStatusType, Attribute, AttributeType, Code, Packet, PacketError};
use tracing::{debug, warn};

/// The three records sent over a session's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Start,
    Interim,
    Stop,
}

impl RecordKind {
    pub fn status_type(self) -> AcctStatusType {
        match self {
            RecordKind::Start => AcctStatusType::Start,
            RecordKind::Interim => AcctStatusType::InterimUpdate,
            RecordKind::Stop => AcctStatusType::Stop,
        }
    }

    fn carries_counters(self) -> bool {
        !matches!(self, RecordKind::Start)
    }
}

fn push(packet: &mut Packet, attr_type: AttributeType, value: &[u8]) -> Result<(), PacketError> {
    packet.add_attribute(Attribute::encode_value(attr_type as u8, value)?);
    Ok(())
}

fn push_integer(packet: &mut Packet, attr_type: AttributeType, value: u32) -> Result<(), PacketError> {
    packet.add_attribute(Attribute::integer(attr_type as u8, value)?);
    Ok(())
}

/// Push a value whose shape may be wrong; a malformed address or integer
/// costs only this attribute, not the record
fn push_shaped(
    packet: &mut Packet,
    session: &AcctSession,
    attr_type: AttributeType,
    value: &[u8],
) -> Result<(), PacketError> {
    match Attribute::encode_value(attr_type as u8, value) {
        Ok(attr) => {
            packet.add_attribute(attr);
            Ok(())
        }
        Err(e @ (PacketError::BadAddress(_) | PacketError::BadInteger(_))) => {
            warn!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                attribute = ?attr_type,
                error = %e,
                "Attribute left out of accounting record"
            );
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Build an unsealed Accounting-Request for `session`
///
/// Counters and `now` must already be current; nothing in the session is
/// touched. Framed-IP-Address and Calling-Station-Id are left out when empty;
/// a malformed Framed-IP-Address or NAS attribute is logged and left out.
pub fn build_record(
    kind: RecordKind,
    session: &AcctSession,
    nas: &NasConfig,
    now: u64,
) -> Result<Packet, PacketError> {
    let mut packet = Packet::new(Code::AccountingRequest, rand::random::<u8>(), [0u8; 16]);

    push(&mut packet, AttributeType::UserName, session.username.as_bytes())?;
    if !session.framed_ip.is_empty() {
        push_shaped(
            &mut packet,
            session,
            AttributeType::FramedIpAddress,
            session.framed_ip.as_bytes(),
        )?;
    }
    push_integer(&mut packet, AttributeType::NasPort, session.nas_port)?;
    if !session.calling_station_id.is_empty() {
        push(
            &mut packet,
            AttributeType::CallingStationId,
            session.calling_station_id.as_bytes(),
        )?;
    }
    for (attr_type, value) in nas.leading_attributes() {
        push_shaped(&mut packet, session, attr_type, value.as_bytes())?;
    }
    push(&mut packet, AttributeType::AcctSessionId, session.session_id.as_bytes())?;
    push_integer(&mut packet, AttributeType::AcctStatusType, kind.status_type().as_u32())?;
    if let Some(ref protocol) = nas.framed_protocol {
        push_shaped(&mut packet, session, AttributeType::FramedProtocol, protocol.as_bytes())?;
    }

    if kind.carries_counters() {
        let session_time = u32::try_from(session.session_time(now)).unwrap_or(u32::MAX);
        push_integer(&mut packet, AttributeType::AcctInputOctets, session.bytes_in)?;
        push_integer(&mut packet, AttributeType::AcctOutputOctets, session.bytes_out)?;
        push_integer(&mut packet, AttributeType::AcctSessionTime, session_time)?;
        push_integer(&mut packet, AttributeType::AcctInputGigawords, session.giga_in)?;
        push_integer(&mut packet, AttributeType::AcctOutputGigawords, session.giga_out)?;
    }

    Ok(packet)
}

/// Build a record, send it and wait for the Accounting-Response
pub async fn send_record(
    kind: RecordKind,
    session: &AcctSession,
    nas: &NasConfig,
    transport: &dyn AccountingTransport,
    now: u64,
) -> Result<(), AcctError> {
    let request = build_record(kind, session, nas, now)?;
    debug!(
        key = %session.key,
        username = %session.username,
        kind = ?kind,
        identifier = request.identifier,
        "Sending accounting record"
    );

    let response = match transport.exchange(&request).await {
        Ok(response) => response,
        Err(TransportError::Timeout { attempts, servers }) => {
            warn!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                kind = ?kind,
                attempts = attempts,
                servers = servers,
                "No response to accounting record"
            );
            return Err(AcctError::NoResponse);
        }
        Err(e) => {
            warn!(
                key = %session.key,
                username = %session.username,
                common_name = %session.common_name,
                kind = ?kind,
                error = %e,
                "Accounting record not delivered"
            );
            return Err(e.into());
        }
    };

    if response.code != Code::AccountingResponse {
        warn!(
            key = %session.key,
            username = %session.username,
            code = ?response.code,
            "Unexpected reply to accounting record"
        );
        return Err(AcctError::UnexpectedResponse(response.code.as_u8()));
    }

    Ok(())
}
