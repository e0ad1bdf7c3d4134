use super::*;

impl SshSession {
    /// Connects, opens a PTY shell and waits for the first prompt.
    pub(super) async fn connect(
        params: &ConnectionParams,
        profile: SecurityProfile,
        connect_timeout: Duration,
    ) -> Result<SshSession, ConnectError> {
        let device_addr = params.device_addr();
        let mut handler = templates::by_device_type(&params.device_type)?;
        if !params.secret.is_empty() {
            handler.set_param(ENABLE_PASSWORD, format!("{}\n", params.secret));
        }

        let config = Config {
            preferred: profile.preferred(),
            inactivity_timeout: Some(config::INACTIVITY_TIMEOUT),
            ..Default::default()
        };

        let client = tokio::time::timeout(
            connect_timeout,
            Client::connect_with_config(
                (params.host.clone(), params.port),
                &params.username,
                AuthMethod::with_password(&params.password),
                profile.server_check(),
                config,
            ),
        )
        .await
        .map_err(|_| ConnectError::InitTimeout(format!("connecting to {device_addr}")))??;
        debug!("{} TCP connection successful", device_addr);

        let mut channel = client.get_channel().await?;
        channel
            .request_pty(false, "vt100", 200, 24, 0, 0, &[])
            .await?;
        channel.request_shell(false).await?;
        debug!("{} Shell request successful", device_addr);

        let (sender_to_shell, mut receiver_from_user) = mpsc::channel::<String>(256);
        let (sender_to_user, mut receiver_from_shell) = mpsc::channel::<String>(256);

        let io_task_device_addr = device_addr.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    data = receiver_from_user.recv() => {
                        let Some(data) = data else {
                            debug!("{} Input channel closed.", io_task_device_addr);
                            let _ = channel.eof().await;
                            break;
                        };
                        if let Err(e) = channel.data(data.as_bytes()).await {
                            debug!("{} Failed to send data to shell: {:?}", io_task_device_addr, e);
                            break;
                        }
                    },
                    Some(msg) = channel.wait() => {
                        match msg {
                            ChannelMsg::Data { ref data } => {
                                let text = String::from_utf8_lossy(data).into_owned();
                                if sender_to_user.send(text).await.is_err() {
                                    debug!("{} Shell output receiver dropped. Closing task.", io_task_device_addr);
                                    break;
                                }
                            }
                            ChannelMsg::ExitStatus { exit_status } => {
                                debug!("{} Shell exited with status code: {}", io_task_device_addr, exit_status);
                                let _ = channel.eof().await;
                                break;
                            }
                            ChannelMsg::Eof => {
                                debug!("{} Shell sent EOF.", io_task_device_addr);
                                break;
                            }
                            _ => {}
                        }
                    }
                    else => break,
                }
            }
            debug!("{} SSH I/O task ended.", io_task_device_addr);
        });

        let mut buffer = String::new();
        let mut prompt = String::new();
        let mut initial_output = String::new();

        let init_result = tokio::time::timeout(connect_timeout, async {
            loop {
                let Some(data) = receiver_from_shell.recv().await else {
                    return Err(ConnectError::ChannelDisconnectError);
                };
                trace!("{:?}", data);
                buffer.push_str(&data);
                initial_output.push_str(&data);

                while let Some(newline_pos) = buffer.find('\n') {
                    let line = buffer.drain(..=newline_pos).collect::<String>();
                    handler.read(line.trim_end());
                }

                if !buffer.is_empty() {
                    if handler.read_prompt(&buffer) {
                        handler.read(&buffer);
                        prompt.push_str(&buffer);
                        return Ok(());
                    }
                    if let Some(input) = handler.read_need_write(&buffer) {
                        handler.read(&buffer);
                        buffer.clear();
                        sender_to_shell.send(input).await?;
                    }
                }
            }
        })
        .await;

        match init_result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => {
                return Err(ConnectError::InitTimeout(if initial_output.is_empty() {
                    "waiting for initial prompt".to_string()
                } else {
                    initial_output
                }));
            }
        }
        debug!(
            "{} Initial prompt {:?} in mode {}",
            device_addr,
            prompt,
            handler.current_state()
        );

        Ok(Self {
            client,
            sender: sender_to_shell,
            recv: receiver_from_shell,
            handler,
            prompt,
            device_addr,
            timeout: params
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(config::DEFAULT_COMMAND_TIMEOUT),
            paging_command: templates::paging_command(&params.device_type),
            closed: false,
        })
    }

    /// Checks if the underlying SSH connection is still active.
    pub fn is_connected(&self) -> bool {
        !self.closed && !self.client.is_closed()
    }

    /// Sends one line and collects output until the next prompt.
    pub async fn write_with_timeout(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<Output, ConnectError> {
        if !self.is_connected() {
            return Err(ConnectError::ConnectClosedError);
        }

        let handler = &mut self.handler;
        let recv = &mut self.recv;
        let sender = &self.sender;
        let prompt = &mut self.prompt;

        // Drop anything left over from the previous command.
        while recv.try_recv().is_ok() {}

        sender.send(format!("{command}\n")).await?;

        let mut clean_output = String::new();
        let mut line_buffer = String::new();

        let result = tokio::time::timeout(timeout, async {
            let mut is_error = false;
            loop {
                let Some(data) = recv.recv().await else {
                    return Err(ConnectError::ChannelDisconnectError);
                };
                line_buffer.push_str(&data);

                while let Some(newline_pos) = line_buffer.find('\n') {
                    let line = line_buffer.drain(..=newline_pos).collect::<String>();
                    let trim_start = IGNORE_START_LINE.replace(&line, "");
                    handler.read(trim_start.trim_end());
                    if handler.error() {
                        is_error = true;
                    }
                    clean_output.push_str(&trim_start);
                }

                // The prompt has no trailing newline, so it stays in the buffer.
                if !line_buffer.is_empty() {
                    if handler.read_prompt(&line_buffer) {
                        handler.read(&line_buffer);
                        clean_output.push_str(&line_buffer);
                        *prompt = std::mem::take(&mut line_buffer);
                        return Ok(!is_error);
                    }
                    if let Some(input) = handler.read_need_write(&line_buffer) {
                        handler.read(&line_buffer);
                        line_buffer.clear();
                        trace!("Input required, answering");
                        sender.send(input).await?;
                    }
                }
            }
        })
        .await;

        let success = match result {
            Err(_) => return Err(ConnectError::ExecTimeout(clean_output)),
            Ok(Err(err)) => return Err(err),
            Ok(Ok(success)) => success,
        };

        Ok(Output {
            success,
            content: strip_echo_and_prompt(&clean_output, command),
            all: clean_output,
        })
    }

    /// Walks the mode graph to `mode`, returning the transcript.
    async fn goto_mode(&mut self, mode: &str) -> Result<String, ConnectError> {
        let steps = self.handler.trans_state_write(mode)?;
        let mut all = String::new();
        for (command, expected) in steps {
            debug!("{} Trans state command: {}", self.device_addr, command);
            let output = self.write_with_timeout(&command, self.timeout).await?;
            all.push_str(&output.all);
            if !output.success {
                return Err(ConnectError::CommandRejected {
                    command,
                    output: output.content,
                });
            }
            if self.handler.current_state() != expected {
                return Err(ConnectError::ModeMismatch {
                    expected,
                    actual: self.handler.current_state().to_string(),
                });
            }
        }
        Ok(all)
    }

    /// Runs `command` after moving to `mode`; a device error is returned as
    /// [`ConnectError::CommandRejected`].
    pub async fn write_with_mode(
        &mut self,
        command: &str,
        mode: &str,
    ) -> Result<Output, ConnectError> {
        let transcript = self.goto_mode(mode).await?;
        let mut output = self.write_with_timeout(command, self.timeout).await?;
        if !output.success {
            return Err(ConnectError::CommandRejected {
                command: command.to_string(),
                output: output.content,
            });
        }
        output.all = transcript + &output.all;
        Ok(output)
    }
}

/// Removes the echoed command from the start and the prompt line from the end.
fn strip_echo_and_prompt(all: &str, command: &str) -> String {
    let mut content = all;
    if !command.is_empty()
        && let Some(rest) = content.strip_prefix(command)
    {
        content = rest.trim_start_matches(['\n', '\r']);
    }
    match content.rfind('\n') {
        Some(pos) => content[..pos].trim_end_matches('\r').to_string(),
        None => String::new(),
    }
}

#[async_trait]
impl DeviceSession for SshSession {
    async fn enable(&mut self) -> Result<(), ConnectError> {
        self.goto_mode(ENABLE_MODE).await?;
        debug!("{} Privileged mode reached", self.device_addr);
        if let Some(paging) = self.paging_command {
            let output = self.write_with_timeout(paging, self.timeout).await?;
            if !output.success {
                debug!(
                    "{} Device refused '{}': {}",
                    self.device_addr, paging, output.content
                );
            }
        }
        Ok(())
    }

    async fn send_config_set(&mut self, commands: &CommandSet) -> Result<String, ConnectError> {
        let mut all = self.goto_mode(CONFIG_MODE).await?;
        for command in commands.iter() {
            let output = self.write_with_timeout(command, self.timeout).await?;
            all.push_str(&output.all);
            if !output.success {
                // Leave configuration mode before reporting the rejected line.
                if let Err(e) = self.goto_mode(ENABLE_MODE).await {
                    debug!("{} Failed to leave config mode: {}", self.device_addr, e);
                }
                return Err(ConnectError::CommandRejected {
                    command: command.to_string(),
                    output: output.content,
                });
            }
        }
        all.push_str(&self.goto_mode(ENABLE_MODE).await?);
        Ok(all)
    }

    async fn send_command(&mut self, command: &str) -> Result<String, ConnectError> {
        let output = self.write_with_mode(command, ENABLE_MODE).await?;
        Ok(output.content)
    }

    async fn close(&mut self) -> Result<(), ConnectError> {
        if self.closed {
            return Ok(());
        }
        debug!("{} Closing SSH session...", self.device_addr);

        if self.is_connected()
            && let Err(e) = self.sender.send("exit\n".to_string()).await
        {
            debug!("{} Failed to send exit command: {:?}", self.device_addr, e);
        }
        self.closed = true;
        self.recv.close();

        if let Err(e) = self.client.disconnect().await {
            debug!("{} Disconnect reported: {}", self.device_addr, e);
        }
        debug!("{} SSH session closed", self.device_addr);
        Ok(())
    }
}
