use crate::{
    db::RowID,
    error::{Error, Result},
};

/// Discord refuses longer channel names.
const CHANNEL_NAME_MAX_LEN: usize = 100;

pub fn ticket_channel_name(ticket_id: RowID) -> String {
    format!("ticket-{}", ticket_id)
}

/// Channel name for a renamed ticket. The ticket id always stays the last part.
pub fn renamed_channel(requested: &str, ticket_id: RowID) -> Result<String> {
    let slug = requested.trim().to_lowercase().replace(' ', "-");
    if slug.is_empty() {
        return Err(Error::invalid("The new name cannot be empty"));
    }
    let name = if slug.ends_with('-') {
        format!("{}{}", slug, ticket_id)
    } else {
        format!("{}-{}", slug, ticket_id)
    };
    if name.chars().count() > CHANNEL_NAME_MAX_LEN {
        return Err(Error::invalid(format!("A channel name is at most {} characters long", CHANNEL_NAME_MAX_LEN)));
    }
    Ok(name)
}
