use crate::{Result, UsbDirection, UsbError};
use core::convert::TryFrom;
use num_enum::{FromPrimitive, IntoPrimitive};

/// Control request type.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RequestType {
    /// Request is a USB standard request.
    Standard = 0,
    /// Request is intended for a USB class.
    Class = 1,
    /// Request is vendor-specific.
    Vendor = 2,
    /// Reserved. Requests of this type cannot be classified and are always stalled.
    #[num_enum(default)]
    Reserved = 3,
}

/// Control request recipient.
#[repr(u8)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    /// Request is intended for the entire device.
    Device = 0,
    /// Request is intended for an interface. Generally, the `index` field of the request specifies
    /// the interface number.
    Interface = 1,
    /// Request is intended for an endpoint. Generally, the `index` field of the request specifies
    /// the endpoint address.
    Endpoint = 2,
    /// None of the above.
    Other = 3,
    /// Reserved.
    #[num_enum(default)]
    Reserved = 4,
}

/// Classifies a request by the type bits (6..5) of its `bmRequestType` field.
///
/// The reserved type value 3 yields [`RequestType::Reserved`].
#[inline]
pub fn classify(bm_request_type: u8) -> RequestType {
    RequestType::from((bm_request_type >> 5) & 0b11)
}

/// A control request read from a SETUP packet.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    /// Direction of the request.
    pub direction: UsbDirection,
    /// Type of the request.
    pub request_type: RequestType,
    /// Recipient of the request.
    pub recipient: Recipient,
    /// Request code. The meaning of the value depends on the previous fields.
    pub request: u8,
    /// Request value. The meaning of the value depends on the previous fields.
    pub value: u16,
    /// Request index. The meaning of the value depends on the previous fields.
    pub index: u16,
    /// Length of the DATA stage. For control OUT transfers this is the exact length of the data the
    /// host sent. For control IN transfers this is the maximum length of data the device should
    /// return.
    pub length: u16,
}

impl Request {
    /// Standard USB control request Get Status
    pub const GET_STATUS: u8 = 0;

    /// Standard USB control request Clear Feature
    pub const CLEAR_FEATURE: u8 = 1;

    /// Standard USB control request Set Feature
    pub const SET_FEATURE: u8 = 3;

    /// Standard USB control request Set Address
    pub const SET_ADDRESS: u8 = 5;

    /// Standard USB control request Get Descriptor
    pub const GET_DESCRIPTOR: u8 = 6;

    /// Standard USB control request Set Descriptor
    pub const SET_DESCRIPTOR: u8 = 7;

    /// Standard USB control request Get Configuration
    pub const GET_CONFIGURATION: u8 = 8;

    /// Standard USB control request Set Configuration
    pub const SET_CONFIGURATION: u8 = 9;

    /// Standard USB control request Get Interface
    pub const GET_INTERFACE: u8 = 10;

    /// Standard USB control request Set Interface
    pub const SET_INTERFACE: u8 = 11;

    /// Standard USB control request Synch Frame
    pub const SYNCH_FRAME: u8 = 12;

    /// Standard USB feature Endpoint Halt for Set/Clear Feature
    pub const FEATURE_ENDPOINT_HALT: u16 = 0;

    /// Standard USB feature Device Remote Wakeup for Set/Clear Feature
    pub const FEATURE_DEVICE_REMOTE_WAKEUP: u16 = 1;

    /// Standard USB feature Test Mode for Set/Clear Feature
    pub const FEATURE_TEST_MODE: u16 = 2;

    /// Length of a SETUP packet in bytes.
    pub const SIZE: usize = 8;

    /// Decodes a SETUP packet. Every 8-byte value is a syntactically valid request; reserved type
    /// and recipient bits decode to the `Reserved` variants.
    pub fn from_bytes(buf: &[u8; 8]) -> Request {
        let rt = buf[0];

        Request {
            direction: UsbDirection::from(rt),
            request_type: classify(rt),
            recipient: Recipient::from(rt & 0b11111),
            request: buf[1],
            value: u16::from_le_bytes([buf[2], buf[3]]),
            index: u16::from_le_bytes([buf[4], buf[5]]),
            length: u16::from_le_bytes([buf[6], buf[7]]),
        }
    }

    /// Encodes the request back into SETUP packet form. A `Reserved` recipient is encoded as the
    /// all-ones recipient value.
    pub fn to_bytes(&self) -> [u8; 8] {
        let recipient = match self.recipient {
            Recipient::Reserved => 0b11111,
            r => u8::from(r),
        };

        let mut buf = [0u8; 8];
        buf[0] = (self.direction as u8) | (u8::from(self.request_type) << 5) | recipient;
        buf[1] = self.request;
        buf[2..4].copy_from_slice(&self.value.to_le_bytes());
        buf[4..6].copy_from_slice(&self.index.to_le_bytes());
        buf[6..8].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    /// Gets the descriptor type and index from the value field of a GET_DESCRIPTOR request.
    pub fn descriptor_type_index(&self) -> (u8, u8) {
        ((self.value >> 8) as u8, self.value as u8)
    }
}

impl TryFrom<&[u8]> for Request {
    type Error = UsbError;

    fn try_from(buf: &[u8]) -> Result<Request> {
        match <&[u8; 8]>::try_from(buf) {
            Ok(setup) => Ok(Request::from_bytes(setup)),
            Err(_) => Err(UsbError::InvalidSetupPacket),
        }
    }
}
