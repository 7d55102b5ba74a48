//! Power-cycling tutorial command.
//!
//! Issues a power command and polls its feedback once, printing typed
//! lease and invalid-request failures instead of crashing on them. The
//! flow mirrors the simplest possible use of the power service.

use navrec_client::{PowerClient, PowerRequest, PowerStatus, RpcChannel};
use navrec_common::protocol::{NavError, Result};

pub fn run<C: RpcChannel>(channel: C, request: PowerRequest) -> Result<()> {
    let client = PowerClient::new(channel);

    let ack = match client.power_command(request) {
        Ok(ack) => ack,
        Err(NavError::LeaseUse(message)) => {
            // Another client holds the motor lease; for a tutorial that
            // is a result worth showing, not a crash.
            println!("Lease error: {}", message);
            return Ok(());
        }
        Err(err) => return Err(err),
    };
    println!(
        "Power command {} accepted with status {:?}.",
        ack.command_id, ack.status
    );

    match client.power_command_feedback(ack.command_id) {
        Ok(PowerStatus::Success) => println!("Power command finished successfully."),
        Ok(status) => println!("Power command status: {:?}.", status),
        Err(NavError::InvalidRequest(message)) => {
            println!("Invalid feedback request: {}", message);
        }
        Err(err) => return Err(err),
    }
    Ok(())
}
